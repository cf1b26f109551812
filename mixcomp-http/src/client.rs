//! A client for the Mixin Computer HTTP API.
//!
//! [`ComputerClient`] wraps the four endpoints a payment client needs: the
//! computer descriptor (`GET /`), user lookup (`GET /users/{mix}`), nonce
//! account reservation (`POST /nonce_accounts`) and fee quotes
//! (`POST /fee`). All of them go through [`ComputerClient::call`], which
//! classifies every response into a JSON value or an [`ApiError`].
//!
//! ## Features
//!
//! - Uses `reqwest` for async HTTP requests
//! - Supports an optional per-request timeout
//! - Integrates with `tracing` if the `telemetry` feature is enabled

use mixcomp::MixAddress;
use mixcomp::amount::Amount;
use mixcomp::proto::{
    ComputerInfo, ErrorEnvelope, FeeQuote, FeeRequest, FeeResponse, NonceAccount,
    NonceAccountRequest, UserRecord,
};
use mixcomp::timestamp::UnixTimestamp;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::constants::NOT_FOUND_CODE;
use crate::error::ApiError;

/// A client for the Computer HTTP API.
#[derive(Clone, Debug)]
pub struct ComputerClient {
    /// Base URL of the service, always ending in `/`
    base_url: Url,
    /// Reqwest HTTP client
    client: Client,
    /// Optional request timeout
    timeout: Option<Duration>,
}

impl ComputerClient {
    /// Creates a client for `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
            timeout: None,
        }
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends `method path` with an optional JSON body and returns the JSON
    /// response.
    ///
    /// A body of the form `{"error": {"code", "description"}}` is a service
    /// error whatever the status. Any other non-success status is a service
    /// error carrying the status as its code. A success status with a body
    /// that is not JSON (including an empty body) is a parse error.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] as described above, or if the request could not
    /// be sent.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "mixcomp.computer_client.call",
            skip_all,
            fields(%method, path = %path, outcome = tracing::field::Empty),
        )
    )]
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let result = self.call_inner(method, path, body, "call").await;
        record_result_on_span(&result);
        result
    }

    async fn call_inner(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        context: &'static str,
    ) -> Result<Value, ApiError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::UrlParse { context, source })?;

        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let http_response = req
            .send()
            .await
            .map_err(|source| ApiError::Network { context, source })?;
        let status = http_response.status();
        let text = http_response
            .text()
            .await
            .map_err(|source| ApiError::Network { context, source })?;

        let parsed = serde_json::from_str::<Value>(&text);
        if let Ok(value) = &parsed
            && let Ok(envelope) = ErrorEnvelope::deserialize(value)
        {
            return Err(ApiError::Service {
                context,
                code: envelope.error.code,
                description: envelope.error.description,
            });
        }
        if !status.is_success() {
            return Err(ApiError::Service {
                context,
                code: i64::from(status.as_u16()),
                description: text,
            });
        }
        parsed.map_err(|source| ApiError::Parse { context, source })
    }

    async fn call_typed<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        context: &'static str,
    ) -> Result<R, ApiError> {
        let value = self.call_inner(method, path, body, context).await?;
        serde_json::from_value(value).map_err(|source| ApiError::Parse { context, source })
    }

    /// Fetches the computer descriptor with `GET /`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a
    /// descriptor.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "mixcomp.computer_client.computer_info", skip_all, fields(outcome = tracing::field::Empty))
    )]
    pub async fn computer_info(&self) -> Result<ComputerInfo, ApiError> {
        let result = self.call_typed(Method::GET, "/", None, "GET /").await;
        record_result_on_span(&result);
        result
    }

    /// Looks up the user owning `address` with `GET /users/{address}`.
    ///
    /// Returns `Ok(None)` when the service answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any other failure.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "mixcomp.computer_client.user", skip_all, fields(%address, outcome = tracing::field::Empty))
    )]
    pub async fn user(&self, address: &MixAddress) -> Result<Option<UserRecord>, ApiError> {
        let path = format!("/users/{address}");
        let result = match self
            .call_typed::<UserRecord>(Method::GET, &path, None, "GET /users")
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.service_code() == Some(NOT_FOUND_CODE) => Ok(None),
            Err(e) => Err(e),
        };
        record_result_on_span(&result);
        result
    }

    /// Reserves a nonce account for `address` with `POST /nonce_accounts`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a nonce
    /// account.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "mixcomp.computer_client.nonce_account", skip_all, fields(%address, outcome = tracing::field::Empty))
    )]
    pub async fn nonce_account(&self, address: &MixAddress) -> Result<NonceAccount, ApiError> {
        const CONTEXT: &str = "POST /nonce_accounts";
        let body = serde_json::to_value(NonceAccountRequest {
            mix: address.clone(),
        })
        .map_err(|source| ApiError::Parse {
            context: CONTEXT,
            source,
        })?;
        let result = self
            .call_typed(Method::POST, "/nonce_accounts", Some(&body), CONTEXT)
            .await;
        record_result_on_span(&result);
        result
    }

    /// Quotes the XIN fee for moving `sol_amount` with `POST /fee`.
    ///
    /// The quote is stamped with the local time it arrived.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a quote.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "mixcomp.computer_client.fee", skip_all, fields(%sol_amount, outcome = tracing::field::Empty))
    )]
    pub async fn fee(&self, sol_amount: Amount) -> Result<FeeQuote, ApiError> {
        const CONTEXT: &str = "POST /fee";
        let body = serde_json::to_value(FeeRequest { sol_amount }).map_err(|source| {
            ApiError::Parse {
                context: CONTEXT,
                source,
            }
        })?;
        let result = self
            .call_typed::<FeeResponse>(Method::POST, "/fee", Some(&body), CONTEXT)
            .await
            .map(|response| FeeQuote::new(response, UnixTimestamp::now()));
        record_result_on_span(&result);
        result
    }
}

/// Converts a string URL into a `ComputerClient`.
impl TryFrom<&str> for ComputerClient {
    type Error = ApiError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Normalize: strip trailing slashes and add a single trailing slash
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|source| ApiError::UrlParse {
            context: "Failed to parse base url",
            source,
        })?;
        Ok(Self::new(url))
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("outcome", "ok");
        }
        Err(err) => {
            span.record("outcome", "error");
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to computer failed");
        }
    }
}

/// Records the outcome of a request on the current span.
/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_API_URL;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: &str = "c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d";

    fn user_address() -> MixAddress {
        MixAddress::single_user(Uuid::parse_str(USER).unwrap())
    }

    fn client(server: &MockServer) -> ComputerClient {
        ComputerClient::try_from(server.uri().as_str()).unwrap()
    }

    fn computer_info_json() -> Value {
        json!({
            "members": {
                "app_id": "bdca1d9e-7ad3-4bb8-b3ef-0c9d4f3a6e52",
                "members": [
                    "a2a1e1a5-4e22-4c42-b8c3-5a1f2b9e0d01",
                    "b3b2f2b6-5f33-4d53-89d4-6b2a3c0f1e12"
                ],
                "threshold": 2
            },
            "payer": "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
            "params": { "operation": { "price": "0.001" } }
        })
    }

    #[test]
    fn test_base_url_normalized() {
        let client = ComputerClient::try_from("https://computer.mixin.dev///").unwrap();
        assert_eq!(client.base_url().as_str(), "https://computer.mixin.dev/");
        assert!(ComputerClient::try_from("not a url").is_err());
        assert_eq!(
            ComputerClient::try_from(DEFAULT_API_URL).unwrap().base_url().as_str(),
            "https://computer.mixin.dev/"
        );
    }

    #[tokio::test]
    async fn test_computer_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(computer_info_json()))
            .mount(&server)
            .await;

        let info = client(&server).computer_info().await.unwrap();
        assert_eq!(info.params.operation.price.to_string(), "0.001");
        assert_eq!(info.members.threshold, 2);
    }

    #[tokio::test]
    async fn test_call_returns_raw_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(computer_info_json()))
            .mount(&server)
            .await;

        let value = client(&server).call(Method::GET, "/", None).await.unwrap();
        assert_eq!(value["payer"], "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
    }

    #[tokio::test]
    async fn test_empty_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fee"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client(&server)
            .fee("0.01".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_missing_fields_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client(&server)
            .fee("0.01".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_error_envelope_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "error": { "code": 10001, "description": "internal" } }),
            ))
            .mount(&server)
            .await;

        let err = client(&server).computer_info().await.unwrap_err();
        assert_eq!(err.service_code(), Some(10001));
    }

    #[tokio::test]
    async fn test_failure_status_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).computer_info().await.unwrap_err();
        match err {
            ApiError::Service {
                code, description, ..
            } => {
                assert_eq!(code, 502);
                assert_eq!(description, "bad gateway");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/users/{}", user_address())))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                json!({ "error": { "code": 404, "description": "not found" } }),
            ))
            .mount(&server)
            .await;

        let user = client(&server).user(&user_address()).await.unwrap();
        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn test_registered_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/users/{}", user_address())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "5001",
                "chain_address": "Stake11111111111111111111111111111111111111"
            })))
            .mount(&server)
            .await;

        let user = client(&server).user(&user_address()).await.unwrap().unwrap();
        assert!(user.is_registered());
    }

    #[tokio::test]
    async fn test_nonce_account_sends_mix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nonce_accounts"))
            .and(body_json(json!({ "mix": user_address().to_string() })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nonce_address": "Vote111111111111111111111111111111111111111",
                "nonce_hash": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            })))
            .mount(&server)
            .await;

        let nonce = client(&server).nonce_account(&user_address()).await.unwrap();
        assert_eq!(nonce.nonce_address, "Vote111111111111111111111111111111111111111");
    }

    #[tokio::test]
    async fn test_fee_quote_is_stamped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fee"))
            .and(body_json(json!({ "sol_amount": "0.01" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fee_id": "0f3c9a4e-9d39-4e53-a8a6-2b5e5a1f7b10",
                "xin_amount": "0.00123456789"
            })))
            .mount(&server)
            .await;

        let before = UnixTimestamp::now();
        let quote = client(&server).fee("0.01".parse().unwrap()).await.unwrap();
        assert!(quote.quoted_at >= before);
        assert_eq!(quote.xin_amount.to_string(), "0.00123456789");
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(computer_info_json())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .with_timeout(Duration::from_millis(50))
            .computer_info()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }), "{err:?}");
    }
}
