//! # motif-growth
//!
//! **Growth Orchestrator**: drives one extraction result through the
//! registry: per populated domain, quantize → novelty check → name → depth →
//! persist. Domains succeed or fail independently; every extraction with at
//! least one usable domain also records a joint `full_blend` record.
//!
//! ```text
//! Extraction ──▶ GrowthEngine::grow ──▶ RegistryStore::ensure (per domain)
//!                                   └──▶ RegistryStore::record_blend (full_blend)
//!                                   └──▶ GrowthReport { added, repeated, failures, batch }
//! ```

pub mod engine;
pub mod error;
pub mod job;
pub mod model;

pub use engine::{GrowthConfig, GrowthEngine, FULL_BLEND};
pub use error::GrowthError;
pub use job::{parse_job, ExtractionJob};
pub use model::{DomainOutcome, GrowthReport};
