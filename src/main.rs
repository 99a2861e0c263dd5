//! The Basement keeper
//!
//! Compounds rewards every cycle and rebalances the vault when the SOL
//! price swings or small bins out-yield large bins.

use std::process::ExitCode;

use anyhow::Result;
use tokio::sync::watch;

use basement_keeper::bootstrap::bootstrap;
use basement_keeper::config::AppConfig;
use basement_keeper::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "❌ Fatal startup error");
            eprintln!("basement-keeper: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    // flushes the file appender when run() returns
    let _log_guard = init_tracing(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %config, "Starting keeper bot");

    let scheduler = bootstrap(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
