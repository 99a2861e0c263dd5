//! Oracle module - prioritized price fallback and movement tracking
//!
//! Resolves the SOL/USD reference price from Pyth, then Switchboard, then
//! a Binance quote, and keeps the rolling window used to flag large swings.

mod chain;
pub mod sources;
mod tracker;

pub use chain::{OraclePrice, PriceOracleChain};
pub use sources::PriceSource;
pub use tracker::{PriceMovementTracker, DEFAULT_ALERT_THRESHOLD_PCT, DEFAULT_HISTORY_LEN};
