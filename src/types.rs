//! Core types used throughout the keeper
//!
//! Defines price samples, bin categories, yield snapshots and the
//! per-cycle result record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::CycleError;

/// A single observed reference price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl PricePoint {
    pub fn now(value: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
        }
    }
}

/// Risk/liquidity tier the vault allocates deposits into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinCategory {
    Large,
    Medium,
    Small,
}

impl BinCategory {
    pub const ALL: [BinCategory; 3] = [BinCategory::Large, BinCategory::Medium, BinCategory::Small];

    /// Key used by venue payloads and logs (e.g. "large_bin")
    pub fn key(&self) -> &'static str {
        match self {
            BinCategory::Large => "large_bin",
            BinCategory::Medium => "medium_bin",
            BinCategory::Small => "small_bin",
        }
    }
}

impl fmt::Display for BinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-category, per-venue annualized yields collected in one cycle.
///
/// Rebuilt every cycle and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YieldSnapshot {
    rates: HashMap<BinCategory, BTreeMap<String, f64>>,
}

impl YieldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a venue's yield for one category
    pub fn insert(&mut self, category: BinCategory, venue: impl Into<String>, rate: f64) {
        self.rates
            .entry(category)
            .or_default()
            .insert(venue.into(), rate);
    }

    /// Venue → rate map for a category (empty if nobody reported)
    pub fn venues(&self, category: BinCategory) -> impl Iterator<Item = (&str, f64)> {
        self.rates
            .get(&category)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Number of venues that reported a value for the category
    pub fn reporting(&self, category: BinCategory) -> usize {
        self.rates.get(&category).map(|m| m.len()).unwrap_or(0)
    }

    /// Arithmetic mean over reporting venues, 0.0 when none reported.
    ///
    /// A zero here means "no signal"; use [`YieldSnapshot::reporting`] or
    /// [`YieldSnapshot::checked_average`] before treating it as a rate.
    pub fn average(&self, category: BinCategory) -> f64 {
        self.checked_average(category).unwrap_or(0.0)
    }

    /// Mean over reporting venues, `None` when no venue reported
    pub fn checked_average(&self, category: BinCategory) -> Option<f64> {
        let rates = self.rates.get(&category)?;
        if rates.is_empty() {
            return None;
        }
        Some(rates.values().sum::<f64>() / rates.len() as f64)
    }

    /// Names of every venue present in the snapshot
    pub fn venue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rates
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.rates.values().all(|m| m.is_empty())
    }
}

impl fmt::Display for YieldSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = BinCategory::ALL
            .iter()
            .map(|c| match self.checked_average(*c) {
                Some(avg) => format!("{}={:.4} ({} venues)", c, avg, self.reporting(*c)),
                None => format!("{}=n/a", c),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Inputs the rebalance policy decided on. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebalanceSignal {
    pub price_moved: bool,
    /// small-bin average minus large-bin average; `None` when either side had no venues
    pub yield_gap: Option<f64>,
}

/// Terminal state of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    PartialFailure,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Success => write!(f, "success"),
            CycleOutcome::PartialFailure => write!(f, "partial_failure"),
        }
    }
}

/// What happened during one cycle, consumed only for logging
#[derive(Debug, Default)]
pub struct CycleResult {
    pub price: Option<f64>,
    pub compounded: bool,
    pub rebalanced: bool,
    pub errors: Vec<CycleError>,
}

impl CycleResult {
    pub fn outcome(&self) -> CycleOutcome {
        if self.errors.is_empty() {
            CycleOutcome::Success
        } else {
            CycleOutcome::PartialFailure
        }
    }

    /// Number of maintenance transactions that were accepted by the ledger
    pub fn transactions_submitted(&self) -> usize {
        usize::from(self.compounded) + usize::from(self.rebalanced)
    }
}
