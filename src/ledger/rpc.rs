//! JSON-RPC backed ledger client

use std::time::Duration;

use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

use super::LedgerClient;
use crate::error::LedgerError;

/// [`LedgerClient`] over a Solana RPC endpoint.
///
/// Every request is bounded by the configured timeout, both at the HTTP
/// layer and by an outer `tokio::time::timeout`.
pub struct RpcLedgerClient {
    client: RpcClient,
    commitment: CommitmentConfig,
    timeout: Duration,
}

impl RpcLedgerClient {
    pub fn new(url: &str, timeout: Duration, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout,
                commitment,
            ),
            commitment,
            timeout,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, LedgerError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(LedgerError::Rpc(e.to_string())),
            Err(_) => Err(LedgerError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let response = self
            .bounded(
                self.client
                    .get_account_with_commitment(address, self.commitment),
            )
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.bounded(self.client.get_latest_blockhash()).await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(self.commitment.commitment),
            ..Default::default()
        };
        self.bounded(self.client.send_transaction_with_config(transaction, config))
            .await
    }
}
