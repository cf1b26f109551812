//! Unsigned system-call transactions.

use solana_instruction::Instruction;
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::v0::Message as MessageV0;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;

use crate::error::SvmError;
use crate::system::{SYSTEM_PROGRAM_ID, is_advance_nonce};

/// Index of the authority account in a nonce advance.
const NONCE_AUTHORITY_ACCOUNT: u8 = 2;

/// Parsed instruction with its index and resolved account keys.
#[derive(Debug)]
pub struct CallInstruction<'a> {
    index: usize,
    instruction: &'a CompiledInstruction,
    account_keys: &'a [Pubkey],
}

impl CallInstruction<'_> {
    /// Position in the transaction.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the instruction data as a slice.
    #[must_use]
    pub const fn data_slice(&self) -> &[u8] {
        self.instruction.data.as_slice()
    }

    /// Returns the program ID of the instruction.
    #[must_use]
    pub fn program_id(&self) -> Pubkey {
        *self.instruction.program_id(self.account_keys)
    }

    /// Returns the account public key at the given index.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::NoAccountAtIndex`] if the index is out of bounds.
    pub fn account(&self, index: u8) -> Result<Pubkey, SvmError> {
        let account_index = self
            .instruction
            .accounts
            .get(usize::from(index))
            .copied()
            .ok_or(SvmError::NoAccountAtIndex(index))?;
        self.account_keys
            .get(usize::from(account_index))
            .copied()
            .ok_or(SvmError::NoAccountAtIndex(index))
    }

    /// Every account the instruction touches, program included.
    pub fn accounts(&self) -> impl Iterator<Item = Pubkey> + '_ {
        std::iter::once(usize::from(self.instruction.program_id_index))
            .chain(self.instruction.accounts.iter().map(|i| usize::from(*i)))
            .filter_map(|i| self.account_keys.get(i).copied())
    }
}

/// A v0 transaction with placeholder signatures, ready for the Computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCallTransaction {
    inner: VersionedTransaction,
}

impl SystemCallTransaction {
    /// Compiles `instructions` into a v0 message paid by `payer` with
    /// `nonce_hash` as recent block hash. Signatures are left zeroed.
    ///
    /// No layout check is made; see [`SystemCallTransaction::verify`].
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::Compile`] if the message cannot be compiled.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        nonce_hash: Hash,
    ) -> Result<Self, SvmError> {
        let message = MessageV0::try_compile(payer, instructions, &[], nonce_hash)
            .map_err(|e| SvmError::Compile(format!("{e:?}")))?;
        let message = VersionedMessage::V0(message);
        let num_required = usize::from(message.header().num_required_signatures);
        Ok(Self {
            inner: VersionedTransaction {
                signatures: vec![Signature::default(); num_required],
                message,
            },
        })
    }

    /// Decodes a serialized transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::Decoding`] if `bytes` is not a transaction.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SvmError> {
        let inner = bincode::deserialize::<VersionedTransaction>(bytes)
            .map_err(|e| SvmError::Decoding(format!("{e}")))?;
        Ok(Self { inner })
    }

    /// Returns the inner transaction.
    #[must_use]
    pub const fn inner(&self) -> &VersionedTransaction {
        &self.inner
    }

    /// Serializes to wire format.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::Encoding`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SvmError> {
        bincode::serialize(&self.inner).map_err(|e| SvmError::Encoding(format!("{e}")))
    }

    /// The fee payer, i.e. the first static account.
    #[must_use]
    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.inner.message.static_account_keys().first().copied()
    }

    /// The recent block hash, i.e. the nonce value.
    #[must_use]
    pub fn recent_blockhash(&self) -> &Hash {
        self.inner.message.recent_blockhash()
    }

    /// Number of instructions, nonce advance included.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.inner.message.instructions().len()
    }

    /// Returns the instruction at the given index.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::NoInstructionAtIndex`] if the index is out of bounds.
    pub fn instruction(&self, index: usize) -> Result<CallInstruction<'_>, SvmError> {
        let instruction = self
            .inner
            .message
            .instructions()
            .get(index)
            .ok_or(SvmError::NoInstructionAtIndex(index))?;
        Ok(CallInstruction {
            index,
            instruction,
            account_keys: self.inner.message.static_account_keys(),
        })
    }

    /// Checks the layout the Computer requires: instruction 0 advances the
    /// nonce with the fee payer as authority, and the fee payer appears in no
    /// later instruction.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as an [`SvmError`].
    pub fn verify(&self) -> Result<(), SvmError> {
        let payer = self.fee_payer().ok_or(SvmError::NoInstructionAtIndex(0))?;

        let first = self.instruction(0)?;
        if first.program_id() != SYSTEM_PROGRAM_ID || !is_advance_nonce(first.data_slice()) {
            return Err(SvmError::MissingNonceAdvance);
        }
        let authority = first.account(NONCE_AUTHORITY_ACCOUNT)?;
        if authority != payer {
            return Err(SvmError::NonceAuthorityMismatch(authority));
        }

        for index in 1..self.instruction_count() {
            let instruction = self.instruction(index)?;
            if instruction.accounts().any(|account| account == payer) {
                return Err(SvmError::FeePayerIncludedInInstructionAccounts);
            }
        }
        Ok(())
    }
}
