//! Keeper scheduler
//!
//! Runs one maintenance cycle immediately, then one per interval. The
//! interval only starts once the previous cycle has returned, so cycles
//! never overlap. No failure inside a cycle stops the loop; only the
//! shutdown signal does.

use std::time::Duration;

use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::oracle::{PriceMovementTracker, PriceOracleChain};
use crate::policy::RebalancePolicy;
use crate::types::{CycleOutcome, CycleResult};
use crate::vault::MaintenanceActions;
use crate::yields::YieldAggregator;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

pub struct KeeperScheduler {
    oracle: PriceOracleChain,
    tracker: PriceMovementTracker,
    yields: YieldAggregator,
    policy: RebalancePolicy,
    actions: MaintenanceActions,
    interval: Duration,
    state: SchedulerState,
    cycles: u64,
}

impl KeeperScheduler {
    pub fn new(
        oracle: PriceOracleChain,
        tracker: PriceMovementTracker,
        yields: YieldAggregator,
        policy: RebalancePolicy,
        actions: MaintenanceActions,
        interval: Duration,
    ) -> Self {
        Self {
            oracle,
            tracker,
            yields,
            policy,
            actions,
            interval,
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles
    }

    pub fn tracker(&self) -> &PriceMovementTracker {
        &self.tracker
    }

    /// Execute one full maintenance cycle
    pub async fn run_cycle(&mut self) -> CycleResult {
        self.cycles += 1;
        let span = tracing::info_span!("cycle", id = %Uuid::new_v4(), seq = self.cycles);

        self.state = SchedulerState::Running;
        let result = self.execute().instrument(span).await;
        self.state = SchedulerState::Idle;

        result
    }

    async fn execute(&mut self) -> CycleResult {
        tracing::info!("🔄 Starting keeper cycle");
        let mut result = CycleResult::default();

        let price = match self.oracle.get_price().await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping cycle due to price fetching error");
                result.errors.push(e.into());
                return result;
            }
        };
        result.price = Some(price.value);

        let price_moved = self.tracker.record_and_check(price.value);

        if let Err(e) = self.actions.read_vault_state().await {
            tracing::warn!(error = %e, "Skipping cycle due to vault read error");
            result.errors.push(e.into());
            return result;
        }

        let yields = self.yields.collect_yields().await;

        match self.actions.compound_rewards().await {
            Ok(_) => result.compounded = true,
            Err(e) => {
                tracing::error!(error = %e, "❌ Reward compounding failed");
                result.errors.push(e.into());
            }
        }

        let signal = self.policy.signal(price_moved, &yields);
        if self.policy.decide(&signal) {
            tracing::info!(
                price_moved = signal.price_moved,
                yield_gap = ?signal.yield_gap,
                "⚖️ Rebalance triggered"
            );
            match self.actions.rebalance_deposits().await {
                Ok(_) => result.rebalanced = true,
                Err(e) => {
                    tracing::error!(error = %e, "❌ Rebalancing failed");
                    result.errors.push(e.into());
                }
            }
        } else {
            tracing::info!(yield_gap = ?signal.yield_gap, "Rebalancing not needed at this time");
        }

        result
    }

    fn log_result(&self, result: &CycleResult) {
        match result.outcome() {
            CycleOutcome::Success => tracing::info!(
                cycle = self.cycles,
                price = ?result.price,
                compounded = result.compounded,
                rebalanced = result.rebalanced,
                "✅ Keeper cycle completed"
            ),
            CycleOutcome::PartialFailure => {
                let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
                tracing::warn!(
                    cycle = self.cycles,
                    price = ?result.price,
                    compounded = result.compounded,
                    rebalanced = result.rebalanced,
                    errors = ?errors,
                    "Keeper cycle finished with failures"
                );
            }
        }
    }

    /// Run until `shutdown` flips to `true`.
    ///
    /// A cycle in flight when shutdown arrives is abandoned at its next
    /// await point and no further transactions are issued.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            keeper = %self.actions.keeper_pubkey(),
            vault = %self.actions.vault(),
            oracles = ?self.oracle.source_names(),
            venues = self.yields.venue_count(),
            "🚀 Starting keeper scheduler"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let finished = tokio::select! {
                result = self.run_cycle() => Some(result),
                _ = wait_for_shutdown(&mut shutdown) => None,
            };
            match finished {
                Some(result) => self.log_result(&result),
                None => {
                    self.state = SchedulerState::Idle;
                    tracing::warn!(cycle = self.cycles, "Shutdown requested, abandoning in-flight cycle");
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        tracing::info!(cycles = self.cycles, "🛑 Keeper scheduler stopped");
    }
}

/// Resolves once the flag is `true`. A dropped sender can never request
/// shutdown, so this then waits forever.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
