//! Error taxonomy
//!
//! Source-level failures are contained by their owning component; only
//! `PriceUnavailable` and `VaultReadError` abort a cycle, and only
//! `StartupError` stops the process.

use std::time::Duration;

use thiserror::Error;

/// A single price or yield source could not produce a usable value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("price {0} is not a positive finite number")]
    InvalidPrice(f64),

    #[error("price is stale: published {age_secs}s ago (max {max_secs}s)")]
    Stale { age_secs: i64, max_secs: u64 },
}

/// Every oracle source in the chain failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("price unavailable: all oracle sources failed")]
pub struct PriceUnavailable;

/// Errors from the ledger RPC layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("rpc request timed out after {0:?}")]
    Timeout(Duration),
}

/// The vault account could not be read or decoded
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultReadError {
    #[error("vault account {0} not found")]
    NotFound(String),

    #[error("vault account read failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("vault account data invalid: {0}")]
    Decode(String),
}

/// A maintenance transaction could not be built or submitted
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{action} failed: {source}")]
pub struct ActionFailed {
    pub action: &'static str,
    #[source]
    pub source: LedgerError,
}

/// Preconditions that must hold before the scheduler starts
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to load keeper keypair from {path}: {reason}")]
    Credential { path: String, reason: String },

    #[error("failed to bind {what}: {reason}")]
    Binding { what: &'static str, reason: String },
}

/// Failures recorded on a cycle result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    #[error(transparent)]
    PriceUnavailable(#[from] PriceUnavailable),

    #[error(transparent)]
    VaultRead(#[from] VaultReadError),

    #[error(transparent)]
    Action(#[from] ActionFailed),
}

