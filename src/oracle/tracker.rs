//! Price movement tracker - bounded rolling window of reference prices
//!
//! The comparison baseline is the oldest retained sample, so with the
//! default 24-entry window the check is always "now vs ~24 samples ago"
//! and the baseline advances as old entries roll off.

use std::collections::VecDeque;

use crate::types::PricePoint;

pub const DEFAULT_HISTORY_LEN: usize = 24;
pub const DEFAULT_ALERT_THRESHOLD_PCT: f64 = 5.0;

/// Owns the only cross-cycle state of the keeper. Lives as long as the
/// scheduler and is never persisted.
#[derive(Debug, Clone)]
pub struct PriceMovementTracker {
    history: VecDeque<PricePoint>,
    max_len: usize,
    /// Movement (in percent) that counts as significant
    threshold_pct: f64,
}

impl PriceMovementTracker {
    pub fn new(max_len: usize, threshold_pct: f64) -> Self {
        let max_len = max_len.max(1);
        Self {
            history: VecDeque::with_capacity(max_len + 1),
            max_len,
            threshold_pct,
        }
    }

    /// Append a sample, evicting the oldest entry past the bound
    pub fn record(&mut self, point: PricePoint) {
        self.history.push_back(point);
        while self.history.len() > self.max_len {
            self.history.pop_front();
        }
    }

    /// Record `price` with the current timestamp and report whether the
    /// window now shows a significant move
    pub fn record_and_check(&mut self, price: f64) -> bool {
        self.record(PricePoint::now(price));
        let significant = self.detect_significant_movement();

        if let Some(pct) = self.movement_pct() {
            tracing::info!(
                movement_pct = %format!("{:.2}", pct),
                intervals = self.history.len(),
                "📈 Price movement over window"
            );
            if significant {
                tracing::warn!(
                    movement_pct = %format!("{:.2}", pct),
                    threshold_pct = self.threshold_pct,
                    "⚠️ Significant price movement detected"
                );
            }
        }

        significant
    }

    /// `|newest - oldest| / oldest * 100`, `None` with fewer than 2 samples
    pub fn movement_pct(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        let oldest = self.history.front()?.value;
        let newest = self.history.back()?.value;
        if oldest <= 0.0 {
            return None;
        }
        Some(((newest - oldest) / oldest * 100.0).abs())
    }

    /// True iff the window movement exceeds the threshold
    pub fn detect_significant_movement(&self) -> bool {
        self.movement_pct()
            .map(|pct| pct > self.threshold_pct)
            .unwrap_or(false)
    }

    pub fn history(&self) -> impl Iterator<Item = &PricePoint> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_len
    }

    pub fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }
}

impl Default for PriceMovementTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN, DEFAULT_ALERT_THRESHOLD_PCT)
    }
}
