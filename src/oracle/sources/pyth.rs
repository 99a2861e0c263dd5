//! Pyth price account - primary on-chain oracle

use std::sync::Arc;

use async_trait::async_trait;
use pyth_sdk_solana::state::{load_price_account, PriceStatus};
use solana_sdk::pubkey::Pubkey;

use super::{check_staleness, validate_price, PriceSource};
use crate::error::SourceError;
use crate::ledger::LedgerClient;

pub struct PythSource {
    ledger: Arc<dyn LedgerClient>,
    account: Pubkey,
    max_staleness_secs: u64,
}

impl PythSource {
    pub fn new(ledger: Arc<dyn LedgerClient>, account: Pubkey, max_staleness_secs: u64) -> Self {
        Self {
            ledger,
            account,
            max_staleness_secs,
        }
    }
}

/// Decode a Pyth v2 price account into a positive price.
///
/// The aggregate must be in `Trading` status; the price is
/// `agg.price * 10^expo`.
pub fn decode_pyth_price(data: &[u8], now_ts: i64, max_staleness_secs: u64) -> Result<f64, SourceError> {
    let account = load_price_account::<32, ()>(data)
        .map_err(|e| SourceError::Malformed(format!("pyth account: {:?}", e)))?;

    if account.agg.status != PriceStatus::Trading {
        return Err(SourceError::Malformed(format!(
            "pyth aggregate status is {:?}",
            account.agg.status
        )));
    }

    check_staleness(account.timestamp, now_ts, max_staleness_secs)?;

    let price = account.agg.price as f64 * 10f64.powi(account.expo);
    validate_price(price)
}

#[async_trait]
impl PriceSource for PythSource {
    fn name(&self) -> &'static str {
        "Pyth"
    }

    async fn fetch_price(&self) -> Result<f64, SourceError> {
        let data = self
            .ledger
            .get_account_data(&self.account)
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?
            .ok_or_else(|| SourceError::AccountNotFound(self.account.to_string()))?;

        decode_pyth_price(&data, chrono::Utc::now().timestamp(), self.max_staleness_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_ACCOUNT_LEN: usize = 3312;

    #[repr(C, align(8))]
    struct AlignedAccount([u8; PRICE_ACCOUNT_LEN]);

    fn price_account(price: i64, expo: i32, status: u32, timestamp: i64) -> Box<AlignedAccount> {
        let mut acc = Box::new(AlignedAccount([0u8; PRICE_ACCOUNT_LEN]));
        let buf = &mut acc.0;
        buf[0..4].copy_from_slice(&0xa1b2c3d4u32.to_le_bytes()); // magic
        buf[4..8].copy_from_slice(&2u32.to_le_bytes()); // version
        buf[8..12].copy_from_slice(&3u32.to_le_bytes()); // account type: price
        buf[12..16].copy_from_slice(&(PRICE_ACCOUNT_LEN as u32).to_le_bytes());
        buf[20..24].copy_from_slice(&expo.to_le_bytes());
        buf[96..104].copy_from_slice(&timestamp.to_le_bytes());
        buf[208..216].copy_from_slice(&price.to_le_bytes()); // agg.price
        buf[224..228].copy_from_slice(&status.to_le_bytes()); // agg.status
        acc
    }

    #[test]
    fn test_decode_trading_price() {
        let acc = price_account(14_237_000_000, -8, 1, 1_700_000_000);
        let price = decode_pyth_price(&acc.0, 1_700_000_010, 60).unwrap();
        assert!((price - 142.37).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_non_trading_and_zero() {
        let halted = price_account(14_237_000_000, -8, 0, 1_700_000_000);
        assert!(decode_pyth_price(&halted.0, 1_700_000_000, 0).is_err());

        let zero = price_account(0, -8, 1, 1_700_000_000);
        assert_eq!(
            decode_pyth_price(&zero.0, 1_700_000_000, 0),
            Err(SourceError::InvalidPrice(0.0))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_pyth_price(&[0u8; 16], 0, 0),
            Err(SourceError::Malformed(_))
        ));
    }
}
