#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for paying Mixin Computer system calls.
//!
//! Mixin Computer is a custodial group (an MTG) that executes Solana
//! transactions on behalf of Mixin users. A client talks to it in three ways:
//! it registers a user by paying an *add user* operation, it deposits assets
//! into the user's Computer account, and it requests a *system call* that
//! carries a serialized Solana transaction. All three are expressed as Mixin
//! payments whose memo is an operation payload wrapped in the MTG envelope.
//!
//! This crate is transport-agnostic: it only builds and parses the values
//! exchanged with the service.
//!
//! # Modules
//!
//! - [`address`] - `MIX…` settlement addresses derived from members + threshold
//! - [`amount`] - Decimal amounts and fee rounding
//! - [`assets`] - Registry of the assets a client deposits or pays fees with
//! - [`deeplink`] - `mixin.one/pay` deep links
//! - [`encoding`] - Base64 (URL, no padding) helper
//! - [`error`] - Error types shared by the workspace
//! - [`extra`] - Operation payloads and the MTG envelope
//! - [`invoice`] - `MIN…` invoices: line items, storage attachments, codec
//! - [`proto`] - JSON wire types of the Computer HTTP API
//! - [`timestamp`] - Unix timestamps used for fee quote expiry
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod address;
pub mod amount;
pub mod assets;
pub mod deeplink;
pub mod encoding;
pub mod error;
pub mod extra;
pub mod invoice;
pub mod proto;
pub mod timestamp;

pub use address::MixAddress;
pub use amount::Amount;
pub use error::{AddressError, AmountError, AssetError, FeeExpiredError, InvoiceError};
pub use invoice::Invoice;

/// Hash used for address and invoice checksums.
pub(crate) fn sha3_256(parts: &[&[u8]]) -> [u8; 32] {
    use sha3::{Digest, Sha3_256};

    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
