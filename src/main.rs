use anyhow::Result;
use clap::Parser;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

mod config;
mod feed;
mod store;
mod sync;

use config::Config;
use feed::{FeedClient, FixtureFeed, Source};
use sync::{Shutdown, SyncEngine, SyncError, SyncReport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let sources = config.sources();
    info!(
        "Syncing {} source(s) into {}",
        sources.len(),
        config.data_dir.display()
    );
    let settings = config.sync_settings();
    if settings.pacing.is_disabled() {
        info!("Pacing disabled (--no-sleep)");
    }

    let feed: Arc<dyn FixtureFeed> = Arc::new(FeedClient::new(config.client_settings())?);

    // Ctrl-C stops the run at the next week boundary or pause
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current week");
            let _ = stop_tx.send(true);
        }
    });

    let engine = SyncEngine::new(feed, settings, Shutdown::new(stop_rx));

    if config.parallel {
        let runs = sources
            .iter()
            .map(|source| sync_source(&engine, &config, source));
        join_all(runs).await;
    } else {
        for source in &sources {
            if engine.stop_requested() {
                warn!("[{}] Skipped: stop requested", source.name);
                continue;
            }
            sync_source(&engine, &config, source).await;
        }
    }

    info!("Done");
    Ok(())
}

/// Run one source; a misconfigured source is skipped, never fatal.
async fn sync_source(engine: &SyncEngine, config: &Config, source: &Source) {
    match engine.run(source, config.forced_week(&source.id)).await {
        Ok(report) => log_report(&report),
        Err(err @ SyncError::ConfigurationMissing { .. }) => warn!("{}", err),
    }
}

fn log_report(report: &SyncReport) {
    let Some(target) = report.target_period else {
        info!("[{}] Stopped before any week was synced", report.source_id);
        return;
    };
    let failures = report.failures();
    info!(
        "[{}] Week {}: {} of {} week(s) processed, {} failed, consolidated {}",
        report.source_id,
        target,
        report.periods.len(),
        report.window.len(),
        failures,
        if report.consolidated_changed() {
            "updated"
        } else {
            "unchanged"
        }
    );
    if failures > 0 {
        warn!(
            "[{}] Failed weeks: {:?}",
            report.source_id,
            report
                .periods
                .iter()
                .filter(|(_, o)| matches!(o, sync::PeriodOutcome::Failed(_)))
                .map(|(p, _)| *p)
                .collect::<Vec<_>>()
        );
    }
}
