//! System program instructions.
//!
//! A system call needs two of them: the nonce advance that opens every
//! transaction and the lamport transfer it pays for. Both come from
//! `solana-system-interface`; this module adds the decoding used to check
//! built transactions.

use solana_instruction::Instruction;

pub use solana_system_interface::instruction::{SystemInstruction, advance_nonce_account, transfer};
pub use solana_system_interface::program::ID as SYSTEM_PROGRAM_ID;

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Fractional digits of a SOL amount.
pub const SOL_DECIMALS: u32 = 9;

/// Decodes system program instruction data.
#[must_use]
pub fn decode(data: &[u8]) -> Option<SystemInstruction> {
    bincode::deserialize(data).ok()
}

/// Whether `data` is a nonce advance.
#[must_use]
pub fn is_advance_nonce(data: &[u8]) -> bool {
    matches!(decode(data), Some(SystemInstruction::AdvanceNonceAccount))
}

/// Lamports moved by the system transfers among `instructions`.
#[must_use]
pub fn lamports_moved(instructions: &[Instruction]) -> u64 {
    instructions
        .iter()
        .filter(|ix| ix.program_id == SYSTEM_PROGRAM_ID)
        .filter_map(|ix| match decode(&ix.data) {
            Some(SystemInstruction::Transfer { lamports }) => Some(lamports),
            _ => None,
        })
        .fold(0, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_pubkey::Pubkey;

    #[test]
    fn test_advance_nonce_accounts() {
        let nonce = Pubkey::new_from_array([1; 32]);
        let payer = Pubkey::new_from_array([2; 32]);
        let ix = advance_nonce_account(&nonce, &payer);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert!(is_advance_nonce(&ix.data));
        assert_eq!(ix.accounts[0].pubkey, nonce);
        assert!(ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[2].pubkey, payer);
        assert!(ix.accounts[2].is_signer);
    }

    #[test]
    fn test_transfer_decodes() {
        let from = Pubkey::new_from_array([1; 32]);
        let to = Pubkey::new_from_array([2; 32]);
        let ix = transfer(&from, &to, LAMPORTS_PER_SOL / 100);
        assert!(!is_advance_nonce(&ix.data));
        assert!(matches!(
            decode(&ix.data),
            Some(SystemInstruction::Transfer { lamports: 10_000_000 })
        ));
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn test_garbage_is_not_a_nonce_advance() {
        assert!(decode(&[0xff; 3]).is_none());
        assert!(!is_advance_nonce(&[]));
    }

    #[test]
    fn test_lamports_moved() {
        let from = Pubkey::new_from_array([1; 32]);
        let nonce = Pubkey::new_from_array([3; 32]);
        let other = Instruction {
            program_id: Pubkey::new_from_array([9; 32]),
            accounts: vec![],
            data: transfer(&from, &nonce, 5).data,
        };
        let ixs = [
            advance_nonce_account(&nonce, &from),
            transfer(&from, &Pubkey::new_from_array([2; 32]), 7),
            transfer(&from, &Pubkey::new_from_array([4; 32]), 11),
            other,
        ];
        assert_eq!(lamports_moved(&ixs), 18);
        assert_eq!(lamports_moved(&[]), 0);
    }
}
