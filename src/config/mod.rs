//! Configuration management for the keeper
//!
//! Loads defaults, then `config/default.*` and `config/local.*`, then
//! `KEEPER__*` environment variables, then the flat variable names used
//! by earlier keeper deployments (`RPC_URL`, `PROGRAM_ID`, ...).
//! `.env` is read first via dotenvy.

use anyhow::{bail, Context, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub keeper: KeeperConfig,
    pub program: ProgramConfig,
    pub oracle: OracleConfig,
    pub price: PriceConfig,
    pub yields: YieldsConfig,
    pub policy: PolicyConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Solana JSON-RPC endpoint
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// processed | confirmed | finalized
    pub commitment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    /// Solana CLI style JSON keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramConfig {
    /// Vault program id
    pub program_id: String,
    /// YieldFarm account the keeper maintains
    pub vault_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Pyth SOL/USD price account (primary)
    pub pyth_account: String,
    /// Switchboard SOL/USD aggregator (secondary, optional)
    #[serde(default)]
    pub switchboard_account: Option<String>,
    /// CEX ticker endpoint (last resort)
    pub cex_url: String,
    pub cex_symbol: String,
    /// Per-source timeout in milliseconds
    pub timeout_ms: u64,
    /// Reject on-chain prices older than this; 0 disables the check
    pub max_staleness_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    /// Rolling window length (samples)
    pub history_len: usize,
    /// Movement over the window that counts as significant (percent)
    pub alert_threshold_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldsConfig {
    /// Venue name -> yield endpoint
    #[serde(default)]
    pub venues: HashMap<String, String>,
    /// Per-venue timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Small-minus-large yield gap that triggers a rebalance (0.03 = 3pp)
    pub yield_gap_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between cycles
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Filter used when RUST_LOG is not set
    pub level: String,
    /// Also write logs under this directory; stdout only when unset
    #[serde(default)]
    pub dir: Option<String>,
    pub file_name: String,
    /// never | minutely | hourly | daily
    pub rotation: String,
}

impl LoggingConfig {
    /// Log directory, `None` when unset or blank
    pub fn log_dir(&self) -> Option<PathBuf> {
        match self.dir.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(dir) => Some(expand_home(dir)),
        }
    }
}

/// Flat environment variables used by earlier keeper deployments and the key
/// each one overrides
const LEGACY_ENV: &[(&str, &str)] = &[
    ("RPC_URL", "rpc.url"),
    ("PROGRAM_ID", "program.program_id"),
    ("PRIVATE_KEY_PATH", "keeper.keypair_path"),
    ("PYTH_SOL_USD_ACCOUNT", "oracle.pyth_account"),
    ("SWITCHBOARD_SOL_USD_ACCOUNT", "oracle.switchboard_account"),
    ("YIELD_FARM_ADDRESS", "program.vault_address"),
    ("REFRESH_INTERVAL", "scheduler.interval_secs"),
    ("ALERT_THRESHOLD", "price.alert_threshold_pct"),
];

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (KEEPER__*)
            .add_source(Environment::with_prefix("KEEPER").separator("__"));

        let builder = apply_legacy_env(builder, |name| std::env::var(name).ok())?;

        Self::from_builder(builder)
    }

    /// Builder pre-populated with every default
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("rpc.url", "https://api.devnet.solana.com")?
            .set_default("rpc.timeout_ms", 10_000)?
            .set_default("rpc.commitment", "confirmed")?
            .set_default("keeper.keypair_path", "~/.config/solana/id.json")?
            .set_default("oracle.cex_url", crate::oracle::sources::BINANCE_TICKER_URL)?
            .set_default("oracle.cex_symbol", "SOLUSDT")?
            .set_default("oracle.timeout_ms", 5_000)?
            .set_default("oracle.max_staleness_secs", 0)?
            .set_default("price.history_len", crate::oracle::DEFAULT_HISTORY_LEN as u64)?
            .set_default("price.alert_threshold_pct", crate::oracle::DEFAULT_ALERT_THRESHOLD_PCT)?
            .set_default("yields.timeout_ms", 5_000)?
            .set_default("policy.yield_gap_threshold", crate::policy::DEFAULT_YIELD_GAP_THRESHOLD)?
            .set_default("scheduler.interval_secs", crate::scheduler::DEFAULT_INTERVAL.as_secs())?
            .set_default("logging.json", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.file_name", "keeper.log")?
            .set_default("logging.rotation", "never")?;
        Ok(builder)
    }

    /// Build, deserialize and validate
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject values the keeper cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be greater than 0");
        }
        if self.price.history_len < 2 {
            bail!("price.history_len must be at least 2");
        }
        if !self.price.alert_threshold_pct.is_finite() || self.price.alert_threshold_pct < 0.0 {
            bail!("price.alert_threshold_pct must be a non-negative number");
        }
        if !self.policy.yield_gap_threshold.is_finite() || self.policy.yield_gap_threshold < 0.0 {
            bail!("policy.yield_gap_threshold must be a non-negative number");
        }
        if self.rpc.timeout_ms == 0 || self.oracle.timeout_ms == 0 || self.yields.timeout_ms == 0 {
            bail!("timeouts must be greater than 0");
        }
        crate::logging::parse_rotation(&self.logging.rotation)?;
        if self.logging.file_name.trim().is_empty() {
            bail!("logging.file_name must not be empty");
        }
        self.commitment()?;
        self.program_id()?;
        self.vault_address()?;
        self.pyth_account()?;
        self.switchboard_account()?;
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        parse_pubkey("program.program_id", &self.program.program_id)
    }

    pub fn vault_address(&self) -> Result<Pubkey> {
        parse_pubkey("program.vault_address", &self.program.vault_address)
    }

    pub fn pyth_account(&self) -> Result<Pubkey> {
        parse_pubkey("oracle.pyth_account", &self.oracle.pyth_account)
    }

    /// `None` when unset or blank
    pub fn switchboard_account(&self) -> Result<Option<Pubkey>> {
        match self.oracle.switchboard_account.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_pubkey("oracle.switchboard_account", value).map(Some),
        }
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        let commitment = CommitmentLevel::from_str(&self.rpc.commitment)
            .map_err(|_| anyhow::anyhow!("rpc.commitment {:?} is not a commitment level", self.rpc.commitment))?;
        Ok(CommitmentConfig { commitment })
    }

    /// Keypair path with a leading `~` expanded
    pub fn keypair_path(&self) -> PathBuf {
        expand_home(&self.keeper.keypair_path)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.timeout_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle.timeout_ms)
    }

    pub fn yields_timeout(&self) -> Duration {
        Duration::from_millis(self.yields.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        let mut venues: Vec<&String> = self.yields.venues.keys().collect();
        venues.sort();
        format!(
            "rpc={} program={} vault={} interval={}s alert={:.2}% gap={:.4} venues={:?}",
            self.rpc.url,
            self.program.program_id,
            self.program.vault_address,
            self.scheduler.interval_secs,
            self.price.alert_threshold_pct,
            self.policy.yield_gap_threshold,
            venues
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

fn parse_pubkey(key: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).with_context(|| format!("{} {:?} is not a valid public key", key, value))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Layer the flat legacy variables on top of `builder`
pub fn apply_legacy_env<F>(mut builder: ConfigBuilder<DefaultState>, lookup: F) -> Result<ConfigBuilder<DefaultState>>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV {
        builder = builder.set_override_option(*key, lookup(var))?;
    }

    if let Some(raw) = lookup("DEX_API_URLS") {
        let venues: HashMap<String, String> =
            serde_json::from_str(&raw).context("DEX_API_URLS must be a JSON object of name -> url")?;
        if !venues.is_empty() {
            builder = builder.set_override("yields.venues", venues)?;
        }
    }

    Ok(builder)
}
