//! Error types for the Computer API client.

/// Errors returned by [`crate::ComputerClient`].
///
/// Every failed request lands in exactly one variant; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request URL could not be built.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The request could not be sent or its body could not be read.
    #[error("network error: {context}: {source}")]
    Network {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The body is not JSON, or not the expected JSON.
    #[error("failed to parse response: {context}: {source}")]
    Parse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The service answered with an error envelope or a failure status.
    #[error("service error {code}: {context}: {description}")]
    Service {
        /// Human-readable context.
        context: &'static str,
        /// Envelope code, or the HTTP status when there is no envelope.
        code: i64,
        /// Envelope description, or the raw body.
        description: String,
    },
}

impl ApiError {
    /// Returns the service error code, if this is a service error.
    #[must_use]
    pub const fn service_code(&self) -> Option<i64> {
        match self {
            Self::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}
