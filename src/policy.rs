//! Rebalance policy
//!
//! Rebalance when either:
//! - the price moved significantly over the tracking window, or
//! - small bins out-yield large bins by more than the gap threshold.
//!
//! The yield trigger needs at least one reporting venue on both sides; an
//! empty category is "no signal", not a zero yield.

use crate::types::{BinCategory, RebalanceSignal, YieldSnapshot};

pub const DEFAULT_YIELD_GAP_THRESHOLD: f64 = 0.03;

#[derive(Debug, Clone, Copy)]
pub struct RebalancePolicy {
    /// small-minus-large yield gap that triggers a rebalance (0.03 = 3pp)
    pub yield_gap_threshold: f64,
}

impl RebalancePolicy {
    pub fn new(yield_gap_threshold: f64) -> Self {
        Self { yield_gap_threshold }
    }

    /// Derive the inputs the decision is taken on
    pub fn signal(&self, price_moved: bool, yields: &YieldSnapshot) -> RebalanceSignal {
        let yield_gap = match (
            yields.checked_average(BinCategory::Small),
            yields.checked_average(BinCategory::Large),
        ) {
            (Some(small), Some(large)) => Some(small - large),
            _ => None,
        };
        RebalanceSignal { price_moved, yield_gap }
    }

    pub fn decide(&self, signal: &RebalanceSignal) -> bool {
        signal.price_moved
            || signal
                .yield_gap
                .map(|gap| gap > self.yield_gap_threshold)
                .unwrap_or(false)
    }

    pub fn should_rebalance(&self, price_moved: bool, yields: &YieldSnapshot) -> bool {
        self.decide(&self.signal(price_moved, yields))
    }
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_YIELD_GAP_THRESHOLD)
    }
}
