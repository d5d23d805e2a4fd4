use std::sync::Arc;
use std::time::Duration;

use motif_registry::{truncate_chars, KnowledgeSnapshot, KnowledgeSource, RegistryStore, SyncBatch};
use rand::Rng;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{BackfillKind, BackfillPage, BackfillReport, BackfillStop, DiscoveryReceipt};
use crate::retry::{parse_retry_after, RetryPolicy, Sleeper, TokioSleeper};

/// Error bodies are cut to this many characters.
pub const BODY_EXCERPT_CHARS: usize = 500;

/// A failed attempt that may be retried.
struct Retryable {
    status:      Option<u16>,
    body:        String,
    retry_after: Option<Duration>,
}

/// Client for the shared discovery store.
///
/// Pushes are idempotent upserts keyed by `(domain, key)`; the server owns
/// count merging, so re-sending a batch after an ambiguous failure is safe.
pub struct SyncClient {
    config:  SyncConfig,
    http:    Client,
    policy:  RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SyncClient {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Ok(Self {
            policy: RetryPolicy::from_config(&config),
            config,
            http,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_env() -> Result<Self, SyncError> {
        Self::new(SyncConfig::from_env())
    }

    /// Replace the sleeper used for backoff and jitter.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ── Discoveries ───────────────────────────────────────────────────────

    /// Upsert a batch. An empty batch sends nothing.
    pub async fn push_discoveries(&self, batch: &SyncBatch) -> Result<DiscoveryReceipt, SyncError> {
        if batch.is_empty() {
            return Ok(DiscoveryReceipt::default());
        }
        let body = batch.to_body()?;
        let receipt: DiscoveryReceipt = self.request_json(Method::POST, "/discoveries", Some(&body)).await?;
        info!(
            entries = batch.entry_count(),
            blends  = batch.blends.len(),
            applied = receipt.total(),
            "discoveries pushed"
        );
        Ok(receipt)
    }

    // ── Knowledge ─────────────────────────────────────────────────────────

    pub async fn knowledge_for_creation(&self) -> Result<KnowledgeSnapshot, SyncError> {
        let mut snapshot: KnowledgeSnapshot =
            self.request_json(Method::GET, "/knowledge/for-creation", None).await?;
        snapshot.source = KnowledgeSource::Remote;
        Ok(snapshot)
    }

    /// Remote knowledge, or the local snapshot of `store` when the remote
    /// store cannot be reached or answers badly.
    pub async fn knowledge_or_local(&self, store: &RegistryStore, max_per_domain: usize) -> KnowledgeSnapshot {
        match self.knowledge_for_creation().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "remote knowledge unavailable, using local registry");
                store.knowledge_snapshot(max_per_domain)
            }
        }
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    pub async fn backfill_names(&self, limit: usize) -> Result<BackfillPage, SyncError> {
        self.backfill_page(BackfillKind::Names, limit).await
    }

    pub async fn backfill_depths(&self, limit: usize) -> Result<BackfillPage, SyncError> {
        self.backfill_page(BackfillKind::Depths, limit).await
    }

    async fn backfill_page(&self, kind: BackfillKind, limit: usize) -> Result<BackfillPage, SyncError> {
        let path = format!("{}?limit={limit}", kind.path());
        let body = serde_json::json!({ "limit": limit });
        self.request_json(Method::POST, &path, Some(&body)).await
    }

    /// Page through one backfill until nothing remains, a page makes no
    /// progress, or `backfill_max_pages` is reached.
    pub async fn backfill_all(&self, kind: BackfillKind) -> Result<BackfillReport, SyncError> {
        let mut report = BackfillReport {
            kind,
            pages: 0,
            processed: 0,
            remaining: 0,
            stop: BackfillStop::PageCap,
        };
        while report.pages < self.config.backfill_max_pages {
            let page = self.backfill_page(kind, self.config.backfill_page_size).await?;
            report.pages += 1;
            report.processed += page.processed;
            report.remaining = page.remaining;
            debug!(kind = ?kind, page = report.pages, processed = page.processed, remaining = page.remaining, "backfill page");

            if page.remaining == 0 {
                report.stop = BackfillStop::Complete;
                break;
            }
            if page.processed == 0 {
                report.stop = BackfillStop::Stalled;
                break;
            }
        }
        info!(kind = ?kind, pages = report.pages, processed = report.processed, stop = ?report.stop, "backfill finished");
        Ok(report)
    }

    // ── Transport ─────────────────────────────────────────────────────────

    async fn jitter(&self) {
        if self.config.max_jitter_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(0..=self.config.max_jitter_ms);
        self.sleeper.sleep(Duration::from_millis(ms)).await;
    }

    /// One JSON request with jitter (hot paths), retry and typed failures.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, SyncError> {
        if self.config.is_hot(path) {
            self.jitter().await;
        }
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

        let mut attempt: u32 = 0;
        loop {
            let failure = match self.send_once(&method, &url, path, body).await? {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if attempt >= self.policy.max_retries {
                return Err(SyncError::TransientBackend {
                    status:   failure.status,
                    path:     path.to_string(),
                    body:     truncate_chars(&failure.body, BODY_EXCERPT_CHARS),
                    attempts: attempt + 1,
                });
            }
            attempt += 1;

            let capacity = self.policy.is_capacity_signal(&failure.body);
            let delay = self.policy.delay(attempt, capacity, failure.retry_after);
            warn!(
                path,
                status   = ?failure.status,
                attempt,
                capacity,
                delay_ms = delay.as_millis() as u64,
                "transient sync failure, backing off"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    /// Outer error: give up now. Inner error: worth retrying.
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Result<T, Retryable>, SyncError> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_builder() => return Err(SyncError::Http(e)),
            Err(e) => {
                return Ok(Err(Retryable {
                    status:      e.status().map(|s| s.as_u16()),
                    body:        e.to_string(),
                    retry_after: None,
                }))
            }
        };

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return Ok(Err(Retryable { status: Some(status), body: e.to_string(), retry_after })),
        };

        if (200..300).contains(&status) {
            return serde_json::from_str(&text).map(Ok).map_err(|e| SyncError::MalformedResponse {
                path:   path.to_string(),
                body:   truncate_chars(&text, BODY_EXCERPT_CHARS),
                reason: e.to_string(),
            });
        }
        if RetryPolicy::is_retryable_status(status) {
            return Ok(Err(Retryable { status: Some(status), body: text, retry_after }));
        }
        Err(SyncError::ClientRejected {
            status,
            path: path.to_string(),
            body: truncate_chars(&text, BODY_EXCERPT_CHARS),
        })
    }
}
