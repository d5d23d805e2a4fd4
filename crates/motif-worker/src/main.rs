//! motif discovery worker.
//!
//! Reads configuration from environment variables (see [`config::WorkerConfig`]),
//! opens the [`RegistryStore`] at the data directory and then, until SIGINT,
//! repeatedly takes the oldest extraction job from the inbox, grows the
//! registry from it and pushes the new discoveries to the shared store.
//!
//! ## Quick start
//!
//! ```bash
//! # Local only
//! MOTIF_DATA_DIR=/var/lib/motif cargo run --bin motif-worker --release
//!
//! # With sync
//! MOTIF_SYNC_ENABLED=true \
//! MOTIF_SYNC_URL=https://registry.example.net \
//! MOTIF_SYNC_API_KEY=... \
//!   cargo run --bin motif-worker --release
//!
//! # One-shot remote maintenance
//! MOTIF_WORKER_MODE=backfill MOTIF_SYNC_ENABLED=true cargo run --bin motif-worker
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use motif_growth::GrowthEngine;
use motif_registry::RegistryStore;
use motif_sync::{BackfillKind, SyncClient};

mod config;
mod cycle;
mod inbox;

use config::{WorkerConfig, WorkerMode};
use cycle::{CycleOutcome, Worker};
use inbox::Inbox;

/// Granularity at which the inter-cycle sleep checks for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────────
    let config = WorkerConfig::from_env();

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .init();

    info!(
        version  = env!("CARGO_PKG_VERSION"),
        data_dir = %config.registry.root.display(),
        inbox    = %config.inbox_dir.display(),
        sync     = config.sync_enabled,
        mode     = ?config.mode,
        "motif worker starting"
    );

    // ── Sync client ───────────────────────────────────────────────────────────
    let sync = if config.sync_enabled {
        Some(SyncClient::new(config.sync.clone())?)
    } else {
        None
    };

    if config.mode == WorkerMode::Backfill {
        let client = sync.ok_or_else(|| anyhow::anyhow!("backfill mode requires MOTIF_SYNC_ENABLED=true"))?;
        for kind in [BackfillKind::Names, BackfillKind::Depths] {
            let report = client.backfill_all(kind).await?;
            info!(kind = ?kind, pages = report.pages, processed = report.processed, remaining = report.remaining, "backfill done");
        }
        return Ok(());
    }

    // ── Registry ──────────────────────────────────────────────────────────────
    let store = RegistryStore::open(config.registry.clone())
        .map_err(|e| anyhow::anyhow!("failed to open registry at {}: {e}", config.registry.root.display()))?;
    let inbox = Inbox::open(&config.inbox_dir)?;
    let pending_jobs = inbox.pending()?;
    let mut worker = Worker::new(store, GrowthEngine::new(config.growth.clone()), sync, inbox, config.pending_cap);

    let stats = worker.store().stats();
    info!(
        entries   = stats.total_entries,
        blends    = stats.blends_logged,
        available = stats.reserve.available,
        jobs      = pending_jobs,
        unsent    = worker.pending().len(),
        "registry ready"
    );

    // ── Shutdown flag ─────────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received SIGINT, finishing current cycle");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    // ── Loop ──────────────────────────────────────────────────────────────────
    while !shutdown.load(Ordering::SeqCst) {
        match worker.run_cycle().await {
            Ok(CycleOutcome::Idle) => debug!("inbox empty"),
            Ok(CycleOutcome::Processed { job, report, synced }) => {
                debug!(job = %job.display(), domains = report.outcomes.len(), synced, "cycle done")
            }
            Ok(CycleOutcome::Rejected { job, error }) => {
                debug!(job = %job.display(), error = %error, "job moved to failed/")
            }
            Err(e) => error!(error = %e, "cycle failed"),
        }
        pause(config.loop_delay, &shutdown).await;
    }

    if !worker.pending().is_empty() {
        info!(pending = worker.pending().len(), "pushing pending discoveries before exit");
        worker.flush().await;
    }
    info!("motif worker shutdown complete");
    Ok(())
}

/// Sleep for `delay`, returning early once shutdown is requested.
async fn pause(delay: Duration, shutdown: &AtomicBool) {
    let mut left = delay;
    while !left.is_zero() && !shutdown.load(Ordering::SeqCst) {
        let step = left.min(SHUTDOWN_POLL);
        tokio::time::sleep(step).await;
        left -= step;
    }
}
