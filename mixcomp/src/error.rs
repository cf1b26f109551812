//! Error types for the core Computer payment types.

use std::fmt;

use uuid::Uuid;

use crate::timestamp::UnixTimestamp;

/// Errors deriving, encoding or parsing a settlement address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// No members were given.
    #[error("settlement address needs at least one member")]
    NoMembers,
    /// More members than the one-byte count can hold.
    #[error("too many members: {0}")]
    TooManyMembers(usize),
    /// Threshold is zero or larger than the member count.
    #[error("invalid threshold {threshold} for {members} members")]
    InvalidThreshold {
        /// The requested threshold.
        threshold: i64,
        /// Number of members.
        members: usize,
    },
    /// The same member appears twice.
    #[error("duplicate member: {0}")]
    DuplicateMember(String),
    /// A member is neither a UUID nor a `XIN` address.
    #[error("invalid member: {0}")]
    InvalidMember(String),
    /// UUID and `XIN` members were mixed.
    #[error("UUID and XIN members can not be mixed")]
    MixedMembers,
    /// String does not start with the expected prefix.
    #[error("missing {0} prefix")]
    InvalidPrefix(&'static str),
    /// Base58 payload could not be decoded.
    #[error("invalid base58: {0}")]
    InvalidEncoding(String),
    /// Checksum does not match the payload.
    #[error("checksum mismatch")]
    InvalidChecksum,
    /// Payload length does not match its header.
    #[error("invalid address length {0}")]
    InvalidLength(usize),
    /// Address format version is not supported.
    #[error("unsupported address version {0}")]
    UnsupportedVersion(u8),
}

/// Error parsing or computing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Text is not a decimal number.
    #[error("invalid decimal amount: {0}")]
    Invalid(String),
    /// Amounts are never negative.
    #[error("negative amount: {0}")]
    Negative(String),
    /// Arithmetic overflowed the decimal range.
    #[error("amount overflow")]
    Overflow,
}

/// Errors building or decoding an invoice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvoiceError {
    /// An invoice holds at most [`crate::invoice::MAX_ITEMS`] line items.
    #[error("too many line items")]
    TooManyItems,
    /// An invoice holds at most [`crate::invoice::MAX_ATTACHMENTS`] storage attachments.
    #[error("too many storage attachments")]
    TooManyAttachments,
    /// A line item references itself or a later item.
    #[error("item {item} references index {reference}, which is not an earlier item")]
    ForwardReference {
        /// Position the item would take.
        item: usize,
        /// The offending reference.
        reference: u8,
    },
    /// A line item carries more than [`crate::invoice::MAX_REFERENCES`] references.
    #[error("too many references: {0}")]
    TooManyReferences(usize),
    /// Trace ids must be unique within an invoice.
    #[error("duplicate trace id {0}")]
    DuplicateTrace(Uuid),
    /// Amount text exceeds the encodable length.
    #[error("amount too long: {0}")]
    AmountTooLong(String),
    /// `extra` exceeds the encodable length.
    #[error("extra too large: {0} bytes")]
    ExtraTooLarge(usize),
    /// Storage data exceeds the storage capacity.
    #[error("storage data too large: {0} bytes")]
    StorageTooLarge(usize),
    /// Invoice string does not start with `MIN`.
    #[error("missing MIN prefix")]
    InvalidPrefix,
    /// Invoice string is not valid base64.
    #[error("invalid base64: {0}")]
    InvalidEncoding(String),
    /// Checksum does not match the payload.
    #[error("checksum mismatch")]
    InvalidChecksum,
    /// Payload ended before a field was complete.
    #[error("truncated invoice at {0}")]
    Truncated(&'static str),
    /// Bytes were left after the last field.
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
    /// Unknown reference tag.
    #[error("invalid reference tag {0}")]
    InvalidReferenceTag(u8),
    /// Invoice version is not supported.
    #[error("unsupported invoice version {0}")]
    UnsupportedVersion(u8),
    /// Embedded recipient address is invalid.
    #[error("invalid recipient: {0}")]
    Recipient(#[from] AddressError),
    /// Embedded amount is invalid.
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),
}

/// Errors validating an asset list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Exactly one asset must be marked as the fee asset.
    #[error("expected exactly one fee asset, found {0}")]
    FeeAssetCount(usize),
    /// A deposit asset has no amount.
    #[error("deposit asset {0} has no amount")]
    MissingAmount(String),
    /// The same asset id is listed twice.
    #[error("duplicate asset {0}")]
    Duplicate(Uuid),
}

/// A fee quote was used after its validity window.
#[derive(Debug, Clone)]
pub struct FeeExpiredError {
    /// The expired fee identifier.
    pub fee_id: Uuid,
    /// When the quote stopped being valid.
    pub expired_at: UnixTimestamp,
    /// When the quote was checked.
    pub checked_at: UnixTimestamp,
}

impl FeeExpiredError {
    /// Creates a new fee-expired error.
    #[must_use]
    pub const fn new(fee_id: Uuid, expired_at: UnixTimestamp, checked_at: UnixTimestamp) -> Self {
        Self {
            fee_id,
            expired_at,
            checked_at,
        }
    }
}

impl fmt::Display for FeeExpiredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fee {} expired at {} (checked at {})",
            self.fee_id, self.expired_at, self.checked_at
        )
    }
}

impl std::error::Error for FeeExpiredError {}
