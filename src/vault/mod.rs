//! Vault program bindings
//!
//! Decoding of the on-chain `YieldFarm` account and the keeper-only
//! maintenance instructions (`compound_rewards`, `rebalance`).

mod actions;
mod state;

pub use actions::{MaintenanceActions, COMPOUND_REWARDS, REBALANCE};
pub use state::{BinAllocation, BinType, VaultState};

#[cfg(test)]
pub(crate) use state::tests::encode_vault;

use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// Anchor discriminator: first 8 bytes of `sha256("<namespace>:<name>")`
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Build an argument-less keeper instruction against the vault.
///
/// Both maintenance instructions take the same accounts:
/// `[keeper (signer, writable), yield_farm (writable)]`.
pub fn keeper_instruction(program_id: &Pubkey, keeper: &Pubkey, vault: &Pubkey, name: &str) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*keeper, true), AccountMeta::new(*vault, false)],
        data: anchor_discriminator("global", name).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_is_sha256_prefix() {
        let expected = Sha256::digest(b"global:compound_rewards");
        assert_eq!(anchor_discriminator("global", "compound_rewards"), expected[..8]);
        assert_ne!(
            anchor_discriminator("global", "compound_rewards"),
            anchor_discriminator("global", "rebalance")
        );
    }

    #[test]
    fn test_keeper_instruction_accounts() {
        let program = Pubkey::new_unique();
        let keeper = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let ix = keeper_instruction(&program, &keeper, &vault, "rebalance");

        assert_eq!(ix.program_id, program);
        assert_eq!(ix.accounts.len(), 2);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[0].pubkey, keeper);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[1].pubkey, vault);
        assert_eq!(ix.data, anchor_discriminator("global", "rebalance").to_vec());
    }
}
