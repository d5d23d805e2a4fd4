//! # motif-registry
//!
//! The local discovery registry. One data directory holds:
//!
//! ```text
//!  <root>/<domain>.json        one collection per domain (19 files)
//!  <root>/blends.json          ring of the most recent blend records
//!  <root>/blends_archive.jsonl records trimmed from the ring
//!  <root>/manifest.json        per-domain file, count, last update
//!  <root>/name_reserve.json    the name pool
//!  <root>/pending_sync.json    payloads awaiting a successful push
//! ```
//!
//! [`RegistryStore::ensure`] is the central operation: quantize a feature
//! value, and either bump the matching entry or allocate a name, decompose
//! the value over its origins and record the discovery.
//!
//! All files are pretty-printed JSON rewritten whole on every change. There
//! is no locking; run one writer per data directory.

pub mod config;
pub mod error;
mod fsio;
pub mod model;
pub mod payload;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use model::{
    truncate_chars, BlendLog, BlendRecord, Collection, KnowledgePool, KnowledgeSnapshot,
    KnowledgeSource, LearnedEntry, Manifest, ManifestEntry, RegistryEntry, RegistryStats,
};
pub use payload::{EntryPayload, SyncBatch};
pub use store::{Ensured, RegistryStore};
