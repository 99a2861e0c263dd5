//! Maintenance actions - one transaction per call
//!
//! Each call builds a fresh single-instruction transaction signed by the
//! keeper and submits it without preflight. Calls are not deduplicated:
//! two calls mean two submissions.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use super::{keeper_instruction, VaultState};
use crate::error::{ActionFailed, LedgerError, VaultReadError};
use crate::ledger::LedgerClient;

pub const COMPOUND_REWARDS: &str = "compound_rewards";
pub const REBALANCE: &str = "rebalance";

pub struct MaintenanceActions {
    ledger: Arc<dyn LedgerClient>,
    keeper: Arc<Keypair>,
    program_id: Pubkey,
    vault: Pubkey,
    /// Bound on each ledger call made by an action
    timeout: Duration,
}

impl MaintenanceActions {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        keeper: Arc<Keypair>,
        program_id: Pubkey,
        vault: Pubkey,
        timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            keeper,
            program_id,
            vault,
            timeout,
        }
    }

    pub fn keeper_pubkey(&self) -> Pubkey {
        self.keeper.pubkey()
    }

    pub fn vault(&self) -> Pubkey {
        self.vault
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, LedgerError>
    where
        F: std::future::Future<Output = Result<T, LedgerError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| LedgerError::Timeout(self.timeout))?
    }

    /// Read and decode the vault account
    pub async fn read_vault_state(&self) -> Result<VaultState, VaultReadError> {
        let data = self
            .bounded(self.ledger.get_account_data(&self.vault))
            .await?
            .ok_or_else(|| VaultReadError::NotFound(self.vault.to_string()))?;

        let state = VaultState::decode(&data)?;

        tracing::info!(
            vault = %self.vault,
            total_deposits = state.total_deposits,
            bins = state.bin_allocations.len(),
            "🏦 Vault state retrieved"
        );
        for allocation in &state.bin_allocations {
            tracing::debug!(
                bin = ?allocation.bin_type,
                target_pct = allocation.allocation_percentage,
                current = allocation.current_allocation,
                step_bps = allocation.step_size,
                "Bin allocation"
            );
        }
        if state.authority != self.keeper.pubkey() {
            tracing::warn!(
                authority = %state.authority,
                keeper = %self.keeper.pubkey(),
                "Keeper is not the vault authority; maintenance calls will be rejected"
            );
        }

        Ok(state)
    }

    async fn submit(&self, action: &'static str) -> Result<Signature, ActionFailed> {
        let fail = |source: LedgerError| ActionFailed { action, source };

        let blockhash = self
            .bounded(self.ledger.latest_blockhash())
            .await
            .map_err(fail)?;

        let keeper = self.keeper.pubkey();
        let instruction = keeper_instruction(&self.program_id, &keeper, &self.vault, action);
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&keeper),
            &[self.keeper.as_ref()],
            blockhash,
        );

        let signature = self
            .bounded(self.ledger.send_transaction(&transaction))
            .await
            .map_err(fail)?;

        tracing::info!(action = %action, signature = %signature, "✅ Transaction submitted");
        Ok(signature)
    }

    /// Claim LP rewards and reinvest them across all bins
    pub async fn compound_rewards(&self) -> Result<Signature, ActionFailed> {
        self.submit(COMPOUND_REWARDS).await
    }

    /// Re-split deposits across bins
    pub async fn rebalance_deposits(&self) -> Result<Signature, ActionFailed> {
        self.submit(REBALANCE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerClient;
    use crate::vault::{anchor_discriminator, encode_vault};
    use solana_sdk::hash::Hash;

    fn actions(ledger: MockLedgerClient, keeper: Arc<Keypair>) -> MaintenanceActions {
        MaintenanceActions::new(
            Arc::new(ledger),
            keeper,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_compound_twice_submits_two_transactions() {
        let keeper = Arc::new(Keypair::new());
        let keeper_pubkey = keeper.pubkey();
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_latest_blockhash()
            .times(2)
            .returning(|| Ok(Hash::new_unique()));
        ledger
            .expect_send_transaction()
            .times(2)
            .withf(move |tx| {
                tx.message.account_keys[0] == keeper_pubkey
                    && tx.message.instructions.len() == 1
                    && tx.message.instructions[0].data
                        == anchor_discriminator("global", COMPOUND_REWARDS).to_vec()
            })
            .returning(|tx| Ok(tx.signatures[0]));

        let actions = actions(ledger, keeper);
        let first = actions.compound_rewards().await.unwrap();
        let second = actions.compound_rewards().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_submission_error_is_action_failed() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_latest_blockhash()
            .returning(|| Ok(Hash::new_unique()));
        ledger
            .expect_send_transaction()
            .returning(|_| Err(LedgerError::Rpc("blockhash not found".to_string())));

        let err = actions(ledger, Arc::new(Keypair::new()))
            .rebalance_deposits()
            .await
            .unwrap_err();
        assert_eq!(err.action, REBALANCE);
        assert!(matches!(err.source, LedgerError::Rpc(_)));
    }

    #[tokio::test]
    async fn test_blockhash_failure_skips_send() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_latest_blockhash()
            .returning(|| Err(LedgerError::Timeout(Duration::from_secs(1))));
        ledger.expect_send_transaction().never();

        let result = actions(ledger, Arc::new(Keypair::new())).compound_rewards().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_vault_state() {
        let keeper = Arc::new(Keypair::new());
        let data = encode_vault(&keeper.pubkey(), 42, &[(0, 80, 0)]);
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_account_data()
            .returning(move |_| Ok(Some(data.clone())));

        let state = actions(ledger, keeper).read_vault_state().await.unwrap();
        assert_eq!(state.total_deposits, 42);
    }

    #[tokio::test]
    async fn test_missing_vault_account() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_account_data().returning(|_| Ok(None));

        let err = actions(ledger, Arc::new(Keypair::new()))
            .read_vault_state()
            .await
            .unwrap_err();
        assert!(matches!(err, VaultReadError::NotFound(_)));
    }
}
