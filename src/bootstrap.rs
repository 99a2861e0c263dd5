//! Startup wiring
//!
//! Everything here runs before the scheduler. Any failure is a
//! [`StartupError`] and the process must not continue.

use std::path::Path;
use std::sync::Arc;

use solana_sdk::signature::{read_keypair_file, Keypair, Signer};

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::ledger::{LedgerClient, RpcLedgerClient};
use crate::oracle::sources::{BinanceTickerSource, PythSource, SwitchboardSource};
use crate::oracle::{PriceMovementTracker, PriceOracleChain};
use crate::policy::RebalancePolicy;
use crate::scheduler::KeeperScheduler;
use crate::vault::MaintenanceActions;
use crate::yields::YieldAggregator;

/// Load the keeper's signing keypair (Solana CLI JSON format)
pub fn load_keypair(path: &Path) -> Result<Keypair, StartupError> {
    read_keypair_file(path).map_err(|e| StartupError::Credential {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn binding<T>(what: &'static str, result: anyhow::Result<T>) -> Result<T, StartupError> {
    result.map_err(|e| StartupError::Binding {
        what,
        reason: format!("{:#}", e),
    })
}

/// Resolve addresses and assemble the scheduler on top of `ledger`
pub fn build_scheduler(
    config: &AppConfig,
    ledger: Arc<dyn LedgerClient>,
    keeper: Arc<Keypair>,
) -> Result<KeeperScheduler, StartupError> {
    let program_id = binding("program id", config.program_id())?;
    let vault = binding("vault account", config.vault_address())?;
    let pyth = binding("pyth price account", config.pyth_account())?;
    let switchboard = binding("switchboard aggregator", config.switchboard_account())?;
    let max_staleness = config.oracle.max_staleness_secs;

    let cex = binding(
        "cex price source",
        BinanceTickerSource::new(&config.oracle.cex_url, &config.oracle.cex_symbol, config.oracle_timeout()),
    )?;

    let oracle = PriceOracleChain::new(config.oracle_timeout())
        .with_source(PythSource::new(ledger.clone(), pyth, max_staleness))
        .with_source(SwitchboardSource::new(ledger.clone(), switchboard, max_staleness))
        .with_source(cex);

    let yields = binding(
        "yield venues",
        YieldAggregator::from_venues(&config.yields.venues, config.yields_timeout()),
    )?;
    if yields.venue_count() == 0 {
        tracing::warn!("No yield venues configured; only price movement can trigger a rebalance");
    }

    let tracker = PriceMovementTracker::new(config.price.history_len, config.price.alert_threshold_pct);
    let policy = RebalancePolicy::new(config.policy.yield_gap_threshold);

    tracing::info!(
        keeper = %keeper.pubkey(),
        program = %program_id,
        vault = %vault,
        "Program bound"
    );

    let actions = MaintenanceActions::new(ledger, keeper, program_id, vault, config.rpc_timeout());

    Ok(KeeperScheduler::new(
        oracle,
        tracker,
        yields,
        policy,
        actions,
        config.interval(),
    ))
}

/// Full startup: keypair, RPC client, bindings
pub fn bootstrap(config: &AppConfig) -> Result<KeeperScheduler, StartupError> {
    let keypair_path = config.keypair_path();
    let keeper = Arc::new(load_keypair(&keypair_path)?);
    tracing::info!(keeper = %keeper.pubkey(), "🔑 Keeper wallet initialized");

    let commitment = binding("rpc commitment", config.commitment())?;
    let client = RpcLedgerClient::new(&config.rpc.url, config.rpc_timeout(), commitment);
    tracing::info!(rpc = %client.url(), commitment = ?commitment.commitment, "Ledger client ready");
    let ledger: Arc<dyn LedgerClient> = Arc::new(client);

    build_scheduler(config, ledger, keeper)
}
