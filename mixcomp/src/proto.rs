//! JSON wire types of the Computer HTTP API.
//!
//! | Endpoint               | Request                    | Response               |
//! |------------------------|----------------------------|------------------------|
//! | `GET /`                | -                          | [`ComputerInfo`]       |
//! | `GET /users/{mix}`     | -                          | [`UserRecord`]         |
//! | `POST /nonce_accounts` | [`NonceAccountRequest`]    | [`NonceAccount`]       |
//! | `POST /fee`            | [`FeeRequest`]             | [`FeeResponse`]        |
//!
//! Failures come back as an [`ErrorEnvelope`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::address::MixAddress;
use crate::amount::Amount;
use crate::error::{AddressError, FeeExpiredError};
use crate::timestamp::UnixTimestamp;

/// Description of the Computer MTG, returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerInfo {
    /// The custodial group.
    pub members: MtgMembers,
    /// Solana fee payer of every system call, base58.
    pub payer: String,
    /// Operation parameters.
    pub params: ComputerParams,
}

/// Members of the Computer MTG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtgMembers {
    /// App id every operation memo is addressed to.
    pub app_id: Uuid,
    /// Member ids.
    pub members: Vec<String>,
    /// Signatures required to move funds.
    pub threshold: i64,
}

impl MtgMembers {
    /// Settlement address of the group.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if the member list or threshold is invalid.
    pub fn mix_address(&self) -> Result<MixAddress, AddressError> {
        MixAddress::from_member_strings(self.members.as_slice(), self.threshold)
    }
}

/// Computer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerParams {
    /// Parameters shared by every operation.
    pub operation: OperationParams,
}

/// Parameters shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    /// XIN price of one operation.
    pub price: Amount,
}

/// Numeric Computer user id.
///
/// Serialized as a decimal string; a JSON number is also accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom("user id must be a non-negative integer")),
        }
    }
}

/// A user as known to the Computer, returned by `GET /users/{mix}`.
///
/// Every field is optional: an unknown address yields an empty record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Computer user id; present once the user is registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    /// Mixin-side details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<UserInfo>,
    /// Solana account the Computer manages for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_address: Option<String>,
}

impl UserRecord {
    /// A user is registered once the Computer assigned it an id.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.id.is_some()
    }
}

/// Mixin-side user details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Mixin user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Body of `POST /nonce_accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceAccountRequest {
    /// Address of the user the nonce account is reserved for.
    pub mix: MixAddress,
}

/// A durable nonce account lent by the Computer for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceAccount {
    /// Nonce account address, base58.
    pub nonce_address: String,
    /// Current nonce value, used as the recent block hash.
    pub nonce_hash: String,
}

/// Body of `POST /fee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRequest {
    /// SOL moved by the transaction.
    pub sol_amount: Amount,
}

/// Response of `POST /fee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeResponse {
    /// Quote id, referenced by the system call.
    pub fee_id: Uuid,
    /// Chain fee in XIN.
    pub xin_amount: Amount,
}

/// A fee quote and the local time it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Quote id.
    pub fee_id: Uuid,
    /// Chain fee in XIN.
    pub xin_amount: Amount,
    /// When the quote was received.
    pub quoted_at: UnixTimestamp,
}

impl FeeQuote {
    /// Stamps a response with the time it was received.
    #[must_use]
    pub const fn new(response: FeeResponse, quoted_at: UnixTimestamp) -> Self {
        Self {
            fee_id: response.fee_id,
            xin_amount: response.xin_amount,
            quoted_at,
        }
    }

    /// Last second the quote may be used with a `ttl_secs` window.
    #[must_use]
    pub fn expires_at(&self, ttl_secs: u64) -> UnixTimestamp {
        self.quoted_at + ttl_secs
    }

    /// Checks the quote is still usable at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`FeeExpiredError`] once `now` is past the window.
    pub fn ensure_fresh(&self, ttl_secs: u64, now: UnixTimestamp) -> Result<(), FeeExpiredError> {
        let expires_at = self.expires_at(ttl_secs);
        if now > expires_at {
            return Err(FeeExpiredError::new(self.fee_id, expires_at, now));
        }
        Ok(())
    }
}

/// Error body returned by the Computer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error.
    pub error: ServiceError,
}

/// Error code and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Service error code.
    pub code: i64,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
}
