//! Basement Keeper Library
//!
//! Off-chain keeper for The Basement yield vault: oracle fallback, price
//! movement tracking, yield aggregation, rebalance policy and scheduling.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod oracle;
pub mod policy;
pub mod scheduler;
pub mod types;
pub mod vault;
pub mod yields;
