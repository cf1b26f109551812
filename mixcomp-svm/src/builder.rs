//! Building size-checked system-call transactions.
//!
//! A payload (the instructions a user wants to run) is prefixed with a nonce
//! advance and compiled against one [`DurableNonce`]. If the payload does not
//! fit the size limit, [`SystemCallBuilder::plan`] splits it greedily, in
//! order, into chunks that each fit in their own transaction; every chunk
//! then needs its own nonce account.

use std::str::FromStr;

use mixcomp::proto::NonceAccount;
use solana_instruction::Instruction;
use solana_message::Hash;
use solana_pubkey::Pubkey;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::SvmError;
use crate::system::advance_nonce_account;
use crate::transaction::SystemCallTransaction;

/// Largest serialized transaction Solana accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Nonce account used while sizing chunks. Every real nonce account has the
/// same encoded size.
const PLACEHOLDER_NONCE: Pubkey = Pubkey::new_from_array([0xfe; 32]);

/// Parses a base58 public key, naming `field` on failure.
///
/// # Errors
///
/// Returns [`SvmError::InvalidPubkey`] if `value` is not a public key.
pub fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, SvmError> {
    Pubkey::from_str(value).map_err(|_| SvmError::InvalidPubkey {
        field,
        value: value.to_owned(),
    })
}

/// A nonce account and its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableNonce {
    /// The nonce account.
    pub address: Pubkey,
    /// The stored nonce, used as recent block hash.
    pub hash: Hash,
}

impl TryFrom<&NonceAccount> for DurableNonce {
    type Error = SvmError;

    fn try_from(value: &NonceAccount) -> Result<Self, Self::Error> {
        Ok(Self {
            address: parse_pubkey("nonce account", &value.nonce_address)?,
            hash: Hash::from_str(&value.nonce_hash)
                .map_err(|_| SvmError::InvalidHash(value.nonce_hash.clone()))?,
        })
    }
}

/// Builds system-call transactions for one fee payer.
#[derive(Debug, Clone, Copy)]
pub struct SystemCallBuilder {
    payer: Pubkey,
    size_limit: usize,
}

impl SystemCallBuilder {
    /// Creates a builder for transactions paid by `payer`, limited to
    /// [`PACKET_DATA_SIZE`].
    #[must_use]
    pub const fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            size_limit: PACKET_DATA_SIZE,
        }
    }

    /// Sets the size limit.
    #[must_use]
    pub const fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Returns the fee payer.
    #[must_use]
    pub const fn payer(&self) -> &Pubkey {
        &self.payer
    }

    /// Returns the size limit.
    #[must_use]
    pub const fn size_limit(&self) -> usize {
        self.size_limit
    }

    /// Builds one transaction running `payload` after advancing `nonce`.
    ///
    /// The result always passes [`SystemCallTransaction::verify`].
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::NoInstructions`] for an empty payload,
    /// [`SvmError::SizeExceeded`] if the transaction is too large, or the
    /// layout error if `payload` uses the fee payer.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "mixcomp.svm.build", skip_all, err, fields(nonce = %nonce.address, instructions = payload.len()))
    )]
    pub fn build(
        &self,
        nonce: &DurableNonce,
        payload: &[Instruction],
    ) -> Result<SystemCallTransaction, SvmError> {
        if payload.is_empty() {
            return Err(SvmError::NoInstructions);
        }
        let tx = self.compile(nonce, payload)?;
        tx.verify()?;
        let size = tx.to_bytes()?.len();
        if size > self.size_limit {
            return Err(SvmError::SizeExceeded {
                size,
                limit: self.size_limit,
            });
        }
        #[cfg(feature = "telemetry")]
        tracing::debug!(size, "built system call transaction");
        Ok(tx)
    }

    /// Splits `payload` into chunks that each fit one transaction.
    ///
    /// Instructions keep their order; a chunk is closed as soon as the next
    /// instruction would not fit.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::SizeExceeded`] if a single instruction does not
    /// fit on its own, or [`SvmError::NoInstructions`] for an empty payload.
    pub fn plan(&self, payload: &[Instruction]) -> Result<Vec<Vec<Instruction>>, SvmError> {
        if payload.is_empty() {
            return Err(SvmError::NoInstructions);
        }
        let mut chunks = Vec::new();
        let mut current: Vec<Instruction> = Vec::new();
        for instruction in payload {
            current.push(instruction.clone());
            if self.measure(&current)? <= self.size_limit {
                continue;
            }
            current.pop();
            if current.is_empty() {
                let size = self.measure(std::slice::from_ref(instruction))?;
                return Err(SvmError::SizeExceeded {
                    size,
                    limit: self.size_limit,
                });
            }
            chunks.push(std::mem::take(&mut current));
            current.push(instruction.clone());
            let size = self.measure(&current)?;
            if size > self.size_limit {
                return Err(SvmError::SizeExceeded {
                    size,
                    limit: self.size_limit,
                });
            }
        }
        chunks.push(current);
        #[cfg(feature = "telemetry")]
        tracing::debug!(chunks = chunks.len(), "planned system call transactions");
        Ok(chunks)
    }

    /// Builds one transaction per chunk of `plan`, consuming one nonce each.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::NotEnoughNonceAccounts`] if `nonces` is shorter
    /// than `plan`, or any error of [`SystemCallBuilder::build`].
    pub fn build_all(
        &self,
        plan: &[Vec<Instruction>],
        nonces: &[DurableNonce],
    ) -> Result<Vec<SystemCallTransaction>, SvmError> {
        if nonces.len() < plan.len() {
            return Err(SvmError::NotEnoughNonceAccounts {
                needed: plan.len(),
                available: nonces.len(),
            });
        }
        plan.iter()
            .zip(nonces)
            .map(|(chunk, nonce)| self.build(nonce, chunk))
            .collect()
    }

    fn compile(
        &self,
        nonce: &DurableNonce,
        payload: &[Instruction],
    ) -> Result<SystemCallTransaction, SvmError> {
        let mut instructions = Vec::with_capacity(1 + payload.len());
        instructions.push(advance_nonce_account(&nonce.address, &self.payer));
        instructions.extend_from_slice(payload);
        SystemCallTransaction::compile(&self.payer, &instructions, nonce.hash.clone())
    }

    fn measure(&self, payload: &[Instruction]) -> Result<usize, SvmError> {
        let nonce = DurableNonce {
            address: PLACEHOLDER_NONCE,
            hash: Hash::default(),
        };
        Ok(self.compile(&nonce, payload)?.to_bytes()?.len())
    }
}
