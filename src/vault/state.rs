//! `YieldFarm` account layout

use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;

use super::anchor_discriminator;
use crate::error::VaultReadError;
use crate::types::BinCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize)]
pub enum BinType {
    LargeBin,
    MediumBin,
    SmallBin,
}

impl From<BinType> for BinCategory {
    fn from(bin: BinType) -> Self {
        match bin {
            BinType::LargeBin => BinCategory::Large,
            BinType::MediumBin => BinCategory::Medium,
            BinType::SmallBin => BinCategory::Small,
        }
    }
}

#[derive(Debug, Clone, PartialEq, BorshDeserialize)]
pub struct BinAllocation {
    pub bin_type: BinType,
    /// Target share of deposits, 0-100
    pub allocation_percentage: u8,
    pub current_allocation: u64,
    /// Bin step in basis points
    pub step_size: u16,
    pub bin_count: u8,
}

#[derive(Debug, Clone, PartialEq, BorshDeserialize)]
struct YieldFarmAccount {
    authority: [u8; 32],
    token_mint: [u8; 32],
    total_deposits: u64,
    bins_count: u8,
    bin_allocations: Vec<BinAllocation>,
    bump: u8,
}

/// Snapshot of the vault read once per cycle; never cached across cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultState {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    pub total_deposits: u64,
    pub bins_count: u8,
    pub bin_allocations: Vec<BinAllocation>,
}

impl VaultState {
    pub const ACCOUNT_NAME: &'static str = "YieldFarm";

    /// Decode raw account data (discriminator + Borsh body)
    pub fn decode(data: &[u8]) -> Result<Self, VaultReadError> {
        if data.len() < 8 {
            return Err(VaultReadError::Decode(format!("{} bytes is too short", data.len())));
        }
        if data[..8] != anchor_discriminator("account", Self::ACCOUNT_NAME) {
            return Err(VaultReadError::Decode(
                "account discriminator does not match YieldFarm".to_string(),
            ));
        }

        let mut body = &data[8..];
        let account = YieldFarmAccount::deserialize(&mut body)
            .map_err(|e| VaultReadError::Decode(e.to_string()))?;

        Ok(Self {
            authority: Pubkey::new_from_array(account.authority),
            token_mint: Pubkey::new_from_array(account.token_mint),
            total_deposits: account.total_deposits,
            bins_count: account.bins_count,
            bin_allocations: account.bin_allocations,
        })
    }

    pub fn allocation(&self, category: BinCategory) -> Option<&BinAllocation> {
        self.bin_allocations
            .iter()
            .find(|a| BinCategory::from(a.bin_type) == category)
    }
}
