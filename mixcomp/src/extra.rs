//! Operation payloads and the MTG envelope.
//!
//! Every instruction to the Computer travels as the memo of a Mixin payment
//! to the MTG. The memo is an [`MtgMemo`]: the Computer's app id followed by
//! an operation payload whose first byte is the [`Operation`] code.

use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

use crate::address::MixAddress;

/// Operation codes understood by the Computer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Register a user by settlement address.
    AddUser = 1,
    /// Run a Solana transaction on behalf of a user.
    SystemCall = 2,
    /// Credit the attached payment to a user's Computer account.
    UserDeposit = 3,
}

impl Operation {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// An operation code followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPayload(Vec<u8>);

impl OperationPayload {
    /// Prefixes `data` with the operation code.
    #[must_use]
    pub fn new(operation: Operation, data: &[u8]) -> Self {
        let mut out = Vec::with_capacity(1 + data.len());
        out.push(operation.code());
        out.extend_from_slice(data);
        Self(out)
    }

    /// Registers the user owning `address`. The address is carried as text.
    #[must_use]
    pub fn add_user(address: &MixAddress) -> Self {
        Self::new(Operation::AddUser, address.to_string().as_bytes())
    }

    /// Requests a system call for the Computer user `user_id`.
    ///
    /// The transaction itself is attached to the invoice separately; this
    /// payload only names the caller, a fresh call id and the fee quote.
    #[must_use]
    pub fn system_call(
        user_id: u64,
        call_id: Uuid,
        skip_post_process: bool,
        fee_id: Option<Uuid>,
    ) -> Self {
        let mut data = Vec::with_capacity(8 + 16 + 1 + 16);
        data.extend_from_slice(&user_id.to_be_bytes());
        data.extend_from_slice(call_id.as_bytes());
        data.push(u8::from(skip_post_process));
        if let Some(fee_id) = fee_id {
            data.extend_from_slice(fee_id.as_bytes());
        }
        Self::new(Operation::SystemCall, &data)
    }

    /// Credits a payment to the Computer user `user_id`.
    #[must_use]
    pub fn user_deposit(user_id: u64) -> Self {
        Self::new(Operation::UserDeposit, &user_id.to_be_bytes())
    }

    /// Returns the operation code, if the payload is non-empty.
    #[must_use]
    pub fn operation_code(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The envelope addressing an operation payload to an MTG app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtgMemo {
    app_id: Uuid,
    payload: OperationPayload,
}

impl MtgMemo {
    /// Wraps `payload` for the app `app_id`.
    #[must_use]
    pub const fn new(app_id: Uuid, payload: OperationPayload) -> Self {
        Self { app_id, payload }
    }

    /// Returns the recipient app id.
    #[must_use]
    pub const fn app_id(&self) -> Uuid {
        self.app_id
    }

    /// Returns the wrapped payload.
    #[must_use]
    pub const fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    /// Returns `app_id ‖ payload`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload.as_bytes();
        let mut out = Vec::with_capacity(16 + payload.len());
        out.extend_from_slice(self.app_id.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Returns the hex memo text.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Returns the memo as carried in an invoice line item's `extra`: the
    /// bytes of the hex text.
    #[must_use]
    pub fn to_extra(&self) -> Vec<u8> {
        self.to_hex().into_bytes()
    }
}

impl Display for MtgMemo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_id() -> Uuid {
        Uuid::parse_str("bdca1d9e-7ad3-4bb8-b3ef-0c9d4f3a6e52").unwrap()
    }

    #[test]
    fn test_add_user_payload_carries_address_text() {
        let user = Uuid::parse_str("c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d").unwrap();
        let addr = MixAddress::single_user(user);
        let payload = OperationPayload::add_user(&addr);
        assert_eq!(payload.operation_code(), Some(1));
        assert_eq!(&payload.as_bytes()[1..], addr.to_string().as_bytes());
    }

    #[test]
    fn test_system_call_layout() {
        let call_id = Uuid::new_v4();
        let fee_id = Uuid::new_v4();
        let payload = OperationPayload::system_call(0x0102, call_id, true, Some(fee_id));
        let bytes = payload.as_bytes();
        assert_eq!(bytes.len(), 1 + 8 + 16 + 1 + 16);
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..9], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(&bytes[9..25], call_id.as_bytes());
        assert_eq!(bytes[25], 1);
        assert_eq!(&bytes[26..], fee_id.as_bytes());
    }

    #[test]
    fn test_system_call_without_fee() {
        let payload = OperationPayload::system_call(7, Uuid::nil(), false, None);
        assert_eq!(payload.as_bytes().len(), 1 + 8 + 16 + 1);
        assert_eq!(payload.as_bytes()[25], 0);
    }

    #[test]
    fn test_memo_prefixes_app_id() {
        let memo = MtgMemo::new(app_id(), OperationPayload::user_deposit(42));
        let bytes = memo.to_bytes();
        assert_eq!(&bytes[..16], app_id().as_bytes());
        assert_eq!(bytes[16], 3);
        assert_eq!(&bytes[17..], &42u64.to_be_bytes());
        assert_eq!(memo.to_string(), hex::encode(&bytes));
        assert_eq!(memo.to_extra(), memo.to_hex().into_bytes());
    }
}
