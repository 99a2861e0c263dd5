//! Switchboard v2 aggregator - secondary on-chain oracle
//!
//! Only the latest confirmed round is read. A round that has not reached
//! the aggregator's minimum oracle responses is treated as unavailable.

use std::mem::size_of;
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use switchboard_solana::AggregatorAccountData;

use super::{check_staleness, validate_price, PriceSource};
use crate::error::SourceError;
use crate::ledger::LedgerClient;

/// Discriminator plus the packed account body
const ACCOUNT_LEN: usize = 8 + size_of::<AggregatorAccountData>();

/// `SwitchboardDecimal` scales beyond this are not representable
const MAX_SCALE: u32 = 28;

pub struct SwitchboardSource {
    ledger: Arc<dyn LedgerClient>,
    account: Option<Pubkey>,
    max_staleness_secs: u64,
}

impl SwitchboardSource {
    /// `account == None` keeps the source in the chain but always unavailable
    pub fn new(ledger: Arc<dyn LedgerClient>, account: Option<Pubkey>, max_staleness_secs: u64) -> Self {
        Self {
            ledger,
            account,
            max_staleness_secs,
        }
    }
}

/// Decode the latest confirmed result of a Switchboard v2 aggregator
pub fn decode_switchboard_price(data: &[u8], now_ts: i64, max_staleness_secs: u64) -> Result<f64, SourceError> {
    // new_from_bytes slices the body without a bounds check
    if data.len() < ACCOUNT_LEN {
        return Err(SourceError::Malformed(format!(
            "switchboard account is {} bytes, need at least {}",
            data.len(),
            ACCOUNT_LEN
        )));
    }

    let aggregator = AggregatorAccountData::new_from_bytes(data)
        .map_err(|e| SourceError::Malformed(format!("switchboard aggregator: {}", e)))?;

    let result = aggregator
        .get_result()
        .map_err(|e| SourceError::Malformed(format!("switchboard round: {}", e)))?;
    let round_open_ts = aggregator.latest_confirmed_round.round_open_timestamp;

    let (mantissa, scale) = (result.mantissa, result.scale);
    if scale > MAX_SCALE {
        return Err(SourceError::Malformed(format!("result scale {} out of range", scale)));
    }

    check_staleness(round_open_ts, now_ts, max_staleness_secs)?;

    let price = mantissa as f64 / 10f64.powi(scale as i32);
    validate_price(price)
}

#[async_trait]
impl PriceSource for SwitchboardSource {
    fn name(&self) -> &'static str {
        "Switchboard"
    }

    async fn fetch_price(&self) -> Result<f64, SourceError> {
        let account = self
            .account
            .ok_or(SourceError::NotConfigured("switchboard aggregator account"))?;

        let data = self
            .ledger
            .get_account_data(&account)
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?
            .ok_or_else(|| SourceError::AccountNotFound(account.to_string()))?;

        decode_switchboard_price(&data, chrono::Utc::now().timestamp(), self.max_staleness_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerClient;
    use crate::vault::anchor_discriminator;
    use switchboard_solana::SwitchboardDecimal;

    fn aggregator_with(mantissa: i128, scale: u32, round_open_ts: i64, num_success: u32) -> Vec<u8> {
        let mut account: AggregatorAccountData = bytemuck::Zeroable::zeroed();
        account.min_oracle_results = 1;
        account.latest_confirmed_round.num_success = num_success;
        account.latest_confirmed_round.round_open_timestamp = round_open_ts;
        account.latest_confirmed_round.result = SwitchboardDecimal { mantissa, scale };

        let mut data = anchor_discriminator("account", "AggregatorAccountData").to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&account));
        data
    }

    fn aggregator(mantissa: i128, scale: u32, round_open_ts: i64) -> Vec<u8> {
        aggregator_with(mantissa, scale, round_open_ts, 1)
    }

    #[test]
    fn test_decode_latest_round() {
        let data = aggregator(1_423_700, 4, 1_700_000_000);
        let price = decode_switchboard_price(&data, 1_700_000_005, 60).unwrap();
        assert!((price - 142.37).abs() < 1e-9);
    }

    #[test]
    fn test_zero_result_is_a_failure() {
        let data = aggregator(0, 4, 1_700_000_000);
        assert_eq!(
            decode_switchboard_price(&data, 1_700_000_000, 0),
            Err(SourceError::InvalidPrice(0.0))
        );
    }

    #[test]
    fn test_unconfirmed_round_is_a_failure() {
        let data = aggregator_with(1_423_700, 4, 1_700_000_000, 0);
        assert!(matches!(
            decode_switchboard_price(&data, 1_700_000_000, 0),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_discriminator_and_short_data() {
        let mut data = aggregator(1_423_700, 4, 0);
        data[0] ^= 0xff;
        assert!(matches!(
            decode_switchboard_price(&data, 0, 0),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            decode_switchboard_price(&[0u8; 100], 0, 0),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn test_stale_round() {
        let data = aggregator(1_423_700, 4, 1_700_000_000);
        assert!(matches!(
            decode_switchboard_price(&data, 1_700_001_000, 300),
            Err(SourceError::Stale { .. })
        ));
    }

    #[test]
    fn test_unconfigured_account_never_hits_ledger() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_account_data().never();

        let source = SwitchboardSource::new(Arc::new(ledger), None, 0);
        assert!(matches!(
            tokio_test::block_on(source.fetch_price()),
            Err(SourceError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_missing_account() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_account_data().returning(|_| Ok(None));

        let source = SwitchboardSource::new(Arc::new(ledger), Some(Pubkey::new_unique()), 0);
        assert!(matches!(
            tokio_test::block_on(source.fetch_price()),
            Err(SourceError::AccountNotFound(_))
        ));
    }
}
