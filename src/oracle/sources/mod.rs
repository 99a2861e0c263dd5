//! Price source implementations (Pyth, Switchboard, Binance)

mod binance;
mod pyth;
mod switchboard;

pub use binance::{BinanceTickerSource, BINANCE_TICKER_URL};
pub use pyth::{decode_pyth_price, PythSource};
pub use switchboard::{decode_switchboard_price, SwitchboardSource};

use async_trait::async_trait;

use crate::error::SourceError;

/// One entry in the oracle fallback chain
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the current reference price.
    ///
    /// Every failure mode (network, missing account, malformed data) is
    /// reported as a [`SourceError`]; implementations never panic.
    async fn fetch_price(&self) -> Result<f64, SourceError>;
}

/// Reject zero, negative, NaN and infinite prices
pub fn validate_price(value: f64) -> Result<f64, SourceError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SourceError::InvalidPrice(value))
    }
}

/// Publish-time staleness check shared by the on-chain oracles.
/// `max_secs == 0` disables the check.
pub(crate) fn check_staleness(published_ts: i64, now_ts: i64, max_secs: u64) -> Result<(), SourceError> {
    if max_secs == 0 {
        return Ok(());
    }
    let age_secs = now_ts.saturating_sub(published_ts);
    if age_secs > max_secs as i64 {
        return Err(SourceError::Stale { age_secs, max_secs });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price_rejects_non_positive() {
        assert_eq!(validate_price(142.5), Ok(142.5));
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_staleness_disabled_with_zero() {
        assert!(check_staleness(0, 1_000_000, 0).is_ok());
        assert!(check_staleness(990, 1_000, 30).is_ok());
        assert_eq!(
            check_staleness(900, 1_000, 30),
            Err(SourceError::Stale {
                age_secs: 100,
                max_secs: 30
            })
        );
    }
}
