//! User registration.
//!
//! A Mixin user becomes a Computer user by paying the operation price to the
//! Computer MTG with an *add user* memo. Registration is keyed by the user's
//! single-member settlement address.

use mixcomp::MixAddress;
use mixcomp::deeplink::transfer_url;
use mixcomp::extra::{MtgMemo, OperationPayload};
use mixcomp::proto::{ComputerInfo, UserRecord};
use mixcomp_http::ComputerClient;
use uuid::Uuid;

use crate::error::FlowError;

/// Settlement address of `user_id`: version 2, one member, threshold 1.
#[must_use]
pub fn user_address(user_id: Uuid) -> MixAddress {
    MixAddress::single_user(user_id)
}

/// Fetches the Computer's record of `user_id`.
///
/// # Errors
///
/// Returns [`FlowError::NotRegistered`] if there is no record or the record
/// has no id, or [`FlowError::Api`] if the lookup fails.
pub async fn registered_user(
    client: &ComputerClient,
    user_id: Uuid,
) -> Result<UserRecord, FlowError> {
    match client.user(&user_address(user_id)).await? {
        Some(record) if record.is_registered() => Ok(record),
        _ => Err(FlowError::NotRegistered(user_id)),
    }
}

/// Whether `user_id` has a Computer account.
///
/// # Errors
///
/// Returns [`FlowError::Api`] if the lookup fails.
pub async fn is_registered(client: &ComputerClient, user_id: Uuid) -> Result<bool, FlowError> {
    match registered_user(client, user_id).await {
        Ok(_) => Ok(true),
        Err(FlowError::NotRegistered(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Link paying for the registration of `user_id`.
///
/// # Errors
///
/// Returns [`FlowError::Address`] if the Computer's member list or threshold
/// is invalid.
pub fn registration_url(
    info: &ComputerInfo,
    pay_url: &str,
    user_id: Uuid,
) -> Result<String, FlowError> {
    let payload = OperationPayload::add_user(&user_address(user_id));
    let memo = MtgMemo::new(info.members.app_id, payload);
    let destination = info.members.mix_address()?;
    Ok(transfer_url(
        pay_url,
        &destination,
        info.params.operation.price,
        &memo,
    ))
}

/// Fetches the computer descriptor and returns the registration link.
///
/// Does not check whether the user is already registered.
///
/// # Errors
///
/// Returns [`FlowError`] if the descriptor cannot be fetched or is invalid.
pub async fn register(
    client: &ComputerClient,
    pay_url: &str,
    user_id: Uuid,
) -> Result<String, FlowError> {
    let info = client.computer_info().await?;
    let url = registration_url(&info, pay_url, user_id)?;
    tracing::info!(%user_id, "registration link ready");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcomp::deeplink::DEFAULT_PAY_URL;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: &str = "c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d";
    const APP_ID: &str = "bdca1d9e-7ad3-4bb8-b3ef-0c9d4f3a6e52";

    fn user() -> Uuid {
        Uuid::parse_str(USER).unwrap()
    }

    fn info_json(threshold: i64) -> serde_json::Value {
        json!({
            "members": {
                "app_id": APP_ID,
                "members": [
                    "a2a1e1a5-4e22-4c42-b8c3-5a1f2b9e0d01",
                    "b3b2f2b6-5f33-4d53-89d4-6b2a3c0f1e12"
                ],
                "threshold": threshold
            },
            "payer": "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
            "params": { "operation": { "price": "0.001" } }
        })
    }

    async fn server_with_user(status: u16, body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/users/{}", user_address(user()))))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> ComputerClient {
        ComputerClient::try_from(server.uri().as_str()).unwrap()
    }

    #[tokio::test]
    async fn test_unregistered_user_gets_registration_link() {
        let server = server_with_user(
            404,
            json!({ "error": { "code": 404, "description": "not found" } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_json(2)))
            .mount(&server)
            .await;
        let client = client(&server);

        assert!(!is_registered(&client, user()).await.unwrap());
        // Idempotent.
        assert!(!is_registered(&client, user()).await.unwrap());

        let url = register(&client, DEFAULT_PAY_URL, user()).await.unwrap();
        assert!(url.starts_with("https://mixin.one/pay/MIX"));
        assert!(url.contains("?amount=0.001&memo="));

        let memo = url.split("memo=").nth(1).unwrap();
        let bytes = hex::decode(memo).unwrap();
        assert_eq!(&bytes[..16], Uuid::parse_str(APP_ID).unwrap().as_bytes());
        assert_eq!(bytes[16], 1);
        assert_eq!(&bytes[17..], user_address(user()).to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_record_without_id_is_not_registered() {
        let server = server_with_user(200, json!({})).await;
        assert!(!is_registered(&client(&server), user()).await.unwrap());
    }

    #[tokio::test]
    async fn test_registered_user() {
        let server = server_with_user(200, json!({ "id": "5001" })).await;
        assert!(is_registered(&client(&server), user()).await.unwrap());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let server = server_with_user(
            500,
            json!({ "error": { "code": 500, "description": "boom" } }),
        )
        .await;
        assert!(matches!(
            is_registered(&client(&server), user()).await,
            Err(FlowError::Api(_))
        ));
    }

    #[test]
    fn test_invalid_threshold_is_address_error() {
        let info: ComputerInfo = serde_json::from_value(info_json(3)).unwrap();
        assert!(matches!(
            registration_url(&info, DEFAULT_PAY_URL, user()),
            Err(FlowError::Address(_))
        ));
    }
}
