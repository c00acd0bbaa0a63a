//! `locus` binary entry point.
//!
//! Parses the command line, opens the selected store and runs collection
//! cycles until interrupted. The store is closed on the way out, including
//! when a signal interrupts a `--once` cycle.

use anyhow::{Context, Result};
use clap::Parser;
use locus::{Collector, Scheduler, cli::Cli, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format, cli.verbose)?;

    info!(provider = ?cli.provider, store = ?cli.store, "locus starting");

    let locations = cli.load_locations().context("Failed to load locations")?;
    let provider = cli.build_provider()?;
    let store = cli.build_store();
    info!(
        locations = locations.len(),
        provider = provider.name(),
        store = store.name(),
        period = ?cli.period(),
        "Configuration loaded"
    );

    store
        .open(&locations)
        .await
        .with_context(|| format!("Failed to open {} store", store.name()))?;

    let collector = Collector::new(locations, provider, store.clone())
        .with_concurrency(usize::try_from(cli.concurrency).unwrap_or(1));

    if cli.once {
        if let Some(report) = collector.run_cycle_until(shutdown_signal()).await {
            info!(
                saved = report.saved(),
                failed = report.failed(),
                "Single cycle finished"
            );
        }
    } else {
        let scheduler = Scheduler::new(collector, cli.period());
        let stats = scheduler.run_until(shutdown_signal()).await;
        info!(
            fired = stats.fired,
            skipped = stats.skipped,
            faults = stats.faults,
            "Scheduler finished"
        );
    }

    if let Err(e) = store.close().await {
        error!(error = %e, "Failed to close store");
        return Err(e).context("Failed to close store");
    }
    info!("locus stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
