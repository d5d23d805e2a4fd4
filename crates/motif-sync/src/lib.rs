//! # motif-sync
//!
//! **Remote Sync Client**: pushes locally discovered entries and blend
//! records to the shared store, reads its knowledge pools and drives its
//! maintenance endpoints.
//!
//! | Endpoint                            | Call                                  |
//! |-------------------------------------|---------------------------------------|
//! | `POST /discoveries`                 | [`SyncClient::push_discoveries`]      |
//! | `GET /knowledge/for-creation`       | [`SyncClient::knowledge_for_creation`] |
//! | `POST /registries/backfill-names`   | [`SyncClient::backfill_names`]        |
//! | `POST /registries/backfill-depths`  | [`SyncClient::backfill_depths`]       |
//!
//! The backend is shared by many workers and runs on a tight CPU budget:
//! 429/5xx/timeouts are retried with backoff, capacity exhaustion backs off
//! for at least ten seconds, and hot endpoints are preceded by random jitter.
//! Other 4xx and malformed bodies fail immediately.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod retry;

pub use client::{SyncClient, BODY_EXCERPT_CHARS};
pub use config::SyncConfig;
pub use error::SyncError;
pub use model::{BackfillKind, BackfillPage, BackfillReport, BackfillStop, DiscoveryReceipt};
pub use retry::{parse_retry_after, RetryPolicy, Sleeper, TokioSleeper, MIN_CAPACITY_BACKOFF};
