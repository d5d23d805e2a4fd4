//! One pick-work → do-work iteration of the worker loop.

use std::path::PathBuf;

use motif_growth::{parse_job, GrowthEngine, GrowthReport};
use motif_registry::{RegistryStore, SyncBatch};
use motif_sync::SyncClient;
use tracing::{error, info, warn};

use crate::inbox::Inbox;

#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing in the inbox.
    Idle,
    Processed {
        job:    PathBuf,
        report: Box<GrowthReport>,
        synced: bool,
    },
    /// The job file could not be read or parsed and was moved to `failed/`.
    Rejected { job: PathBuf, error: String },
}

pub struct Worker {
    store:        RegistryStore,
    engine:       GrowthEngine,
    sync:         Option<SyncClient>,
    inbox:        Inbox,
    /// Payloads whose push failed transiently; re-sent with the next batch
    /// and mirrored to `pending_sync.json` across restarts.
    pending:      SyncBatch,
    pending_path: PathBuf,
    pending_cap:  usize,
}

impl Worker {
    /// Build a worker, picking up payloads a previous run could not push.
    pub fn new(
        store: RegistryStore,
        engine: GrowthEngine,
        sync: Option<SyncClient>,
        inbox: Inbox,
        pending_cap: usize,
    ) -> Self {
        let pending_path = store.config().pending_sync_path();
        let pending = SyncBatch::load(&pending_path);
        if !pending.is_empty() {
            info!(pending = pending.len(), path = %pending_path.display(), "recovered unsent discoveries");
        }
        Self { store, engine, sync, inbox, pending, pending_path, pending_cap }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn pending(&self) -> &SyncBatch {
        &self.pending
    }

    /// Process the oldest job, if any.
    ///
    /// Growth is persisted before syncing; a failed push never undoes it.
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleOutcome> {
        let Some(job_path) = self.inbox.next_job()? else {
            return Ok(CycleOutcome::Idle);
        };

        let parsed = std::fs::read_to_string(&job_path)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_job(&text).map_err(|e| e.to_string()));
        let job = match parsed {
            Ok(job) => job,
            Err(e) => {
                warn!(job = %job_path.display(), error = %e, "rejecting job");
                let moved = self.inbox.reject(&job_path)?;
                return Ok(CycleOutcome::Rejected { job: moved, error: e });
            }
        };

        let mut report = self.engine.grow(&mut self.store, &job.extraction, &job.source_prompt);
        self.pending.merge(std::mem::take(&mut report.batch));
        let dropped = self.pending.trim_to(self.pending_cap);
        if dropped > 0 {
            warn!(dropped, cap = self.pending_cap, "pending sync batch full, oldest payloads dropped");
        }
        self.save_pending();
        let synced = self.flush().await;

        let moved = self.inbox.complete(&job_path)?;
        info!(
            job      = %moved.display(),
            added    = report.total_added(),
            failed   = report.failed_domains().len(),
            synced,
            "job processed"
        );
        Ok(CycleOutcome::Processed { job: moved, report: Box::new(report), synced })
    }

    /// Push everything pending. Returns `true` when nothing is left over.
    pub async fn flush(&mut self) -> bool {
        let Some(client) = &self.sync else {
            self.pending = SyncBatch::new();
            self.save_pending();
            return true;
        };
        if self.pending.is_empty() {
            return true;
        }
        let synced = match client.push_discoveries(&self.pending).await {
            Ok(_) => {
                self.pending = SyncBatch::new();
                true
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, pending = self.pending.len(), "sync failed, keeping batch for next cycle");
                false
            }
            Err(e) => {
                error!(error = %e, dropped = self.pending.len(), "sync rejected, dropping batch");
                self.pending = SyncBatch::new();
                false
            }
        };
        self.save_pending();
        synced
    }

    fn save_pending(&self) {
        if let Err(e) = self.pending.save(&self.pending_path) {
            warn!(path = %self.pending_path.display(), error = %e, "cannot persist pending sync batch");
        }
    }
}
