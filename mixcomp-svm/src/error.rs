//! Error types for system-call transactions.

use solana_pubkey::Pubkey;

/// Errors building, encoding or checking a system-call transaction.
#[derive(Debug, thiserror::Error)]
pub enum SvmError {
    /// A base58 public key could not be parsed.
    #[error("invalid {field} public key: {value}")]
    InvalidPubkey {
        /// Which key was being parsed.
        field: &'static str,
        /// The offending text.
        value: String,
    },
    /// A base58 block hash could not be parsed.
    #[error("invalid nonce hash: {0}")]
    InvalidHash(String),
    /// There is nothing to run.
    #[error("no payload instructions")]
    NoInstructions,
    /// The message could not be compiled.
    #[error("Can not compile message: {0}")]
    Compile(String),
    /// The transaction could not be serialized.
    #[error("Can not encode transaction: {0}")]
    Encoding(String),
    /// The bytes are not a transaction.
    #[error("Can not decode transaction: {0}")]
    Decoding(String),
    /// The serialized transaction is larger than allowed.
    #[error("transaction is {size} bytes, limit is {limit}")]
    SizeExceeded {
        /// Serialized size.
        size: usize,
        /// Allowed size.
        limit: usize,
    },
    /// Fewer nonce accounts than transactions.
    #[error("{needed} nonce accounts needed, {available} available")]
    NotEnoughNonceAccounts {
        /// Transactions to build.
        needed: usize,
        /// Nonce accounts given.
        available: usize,
    },
    /// No instruction found at the given index.
    #[error("Instruction at index {0} not found")]
    NoInstructionAtIndex(usize),
    /// No account found at the given index.
    #[error("No account at index {0}")]
    NoAccountAtIndex(u8),
    /// Instruction 0 does not advance a durable nonce.
    #[error("first instruction must advance the nonce account")]
    MissingNonceAdvance,
    /// The nonce is advanced by someone other than the fee payer.
    #[error("nonce authority {0} is not the fee payer")]
    NonceAuthorityMismatch(Pubkey),
    /// Fee payer was found in instruction accounts.
    #[error("Fee payer included in instruction accounts")]
    FeePayerIncludedInInstructionAccounts,
}
