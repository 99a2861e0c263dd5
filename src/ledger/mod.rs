//! Ledger client - account reads and transaction submission
//!
//! The keeper's only view of the chain. Everything above this module
//! talks to the [`LedgerClient`] trait so decision logic can be tested
//! without a validator.

mod rpc;

pub use rpc::RpcLedgerClient;

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

use crate::error::LedgerError;

/// Read/submit operations the keeper needs from a Solana RPC node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Raw account data, `None` when the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Blockhash to sign the next transaction against
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Submit a signed transaction without preflight simulation
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;
}
