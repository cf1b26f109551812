#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana transactions for Mixin Computer system calls.
//!
//! The Computer executes a Solana transaction on behalf of a user only if it
//! follows a strict shape:
//!
//! - the recent block hash is the hash of a durable nonce account lent by
//!   the Computer, and instruction 0 advances that nonce with the Computer's
//!   payer as authority;
//! - the payer is the fee payer and appears in no other instruction.
//!
//! A nonce account backs exactly one transaction. Transactions are emitted
//! unsigned (all-zero signatures); the Computer signs them.
//!
//! # Modules
//!
//! - [`builder`] - [`SystemCallBuilder`]: size-checked building and splitting
//! - [`error`] - [`SvmError`]
//! - [`system`] - System program instructions (nonce advance, transfer)
//! - [`transaction`] - [`SystemCallTransaction`] wrapper and layout checks
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod builder;
pub mod error;
pub mod system;
pub mod transaction;

pub use builder::{DurableNonce, PACKET_DATA_SIZE, SystemCallBuilder};
pub use error::SvmError;
pub use solana_instruction::{AccountMeta, Instruction};
pub use solana_message::Hash;
pub use solana_pubkey::Pubkey;
pub use transaction::SystemCallTransaction;
