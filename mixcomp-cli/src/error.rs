//! Error types for the payment flows.

use std::fmt;

use mixcomp::{AddressError, AmountError, FeeExpiredError, InvoiceError};
use mixcomp_http::ApiError;
use mixcomp_svm::SvmError;
use uuid::Uuid;

use crate::pipeline::Stage;

/// Errors loading the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The configuration path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML, or not a valid configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Why a stage is misplaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderViolation {
    /// The stage is listed more than once.
    Repeated,
    /// The stage runs before one it requires.
    Requires(Stage),
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repeated => f.write_str("listed twice"),
            Self::Requires(stage) => write!(f, "requires {stage} to run first"),
        }
    }
}

/// Errors in the stage list or between stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A stage runs twice, or before a stage it requires.
    #[error("stage {stage} out of order: {reason}")]
    OutOfOrder {
        /// The misplaced stage.
        stage: Stage,
        /// What is wrong with its position.
        reason: OrderViolation,
    },
    /// A stage did not leave the output a later stage reads.
    #[error("missing output of stage {0}")]
    MissingOutput(Stage),
}

/// Base error type for every flow; the first one aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Request to the Computer failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Settlement address could not be derived.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Amount arithmetic failed.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Invoice could not be built.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// Fee quote was used after its validity window.
    #[error(transparent)]
    ExpiredFee(#[from] FeeExpiredError),

    /// Transaction could not be built.
    #[error(transparent)]
    Svm(#[from] SvmError),

    /// Stage list is invalid.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The user has no Computer account yet.
    #[error("user {0} is not registered")]
    NotRegistered(Uuid),

    /// The Computer has not assigned the user a Solana account.
    #[error("user {0} has no chain address")]
    MissingChainAddress(Uuid),
}
