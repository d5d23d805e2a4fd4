//! Growth Orchestrator: one extraction in, per-domain discoveries out.

use std::collections::BTreeMap;

use motif_core::{env_flag, DepthBreakdown, Domain, Extraction, FeatureValue};
use motif_registry::{
    truncate_chars, BlendRecord, EntryPayload, Ensured, RegistryError, RegistryStore, SyncBatch,
};
use tracing::{debug, info, warn};

use crate::model::{DomainOutcome, GrowthReport};

/// `BlendRecord::domain` of the joint per-extraction record.
pub const FULL_BLEND: &str = "full_blend";

/// Configuration for growth.
#[derive(Debug, Clone)]
pub struct GrowthConfig {
    /// Collect payloads for the remote store in [`GrowthReport::batch`].
    pub sync_enabled:     bool,
    /// Provenance carried in payloads and blends is cut to this length.
    pub source_max_chars: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            sync_enabled:     false,
            source_max_chars: 120,
        }
    }
}

impl GrowthConfig {
    /// `MOTIF_SYNC_ENABLED` toggles payload collection.
    pub fn from_env() -> Self {
        Self { sync_enabled: env_flag("MOTIF_SYNC_ENABLED", false), ..Self::default() }
    }
}

/// A domain that produced a key this round, for the joint record.
struct Touched {
    domain: Domain,
    key:    String,
    name:   String,
    depth:  DepthBreakdown,
}

/// The Growth Orchestrator.
pub struct GrowthEngine {
    pub config: GrowthConfig,
}

impl GrowthEngine {
    pub fn new(config: GrowthConfig) -> Self {
        Self { config }
    }

    /// Grow the registry from one extraction.
    ///
    /// Never fails as a whole: each domain's error is captured in its
    /// [`DomainOutcome::Failed`] and the remaining domains still run.
    pub fn grow(&self, store: &mut RegistryStore, extraction: &Extraction, source_prompt: &str) -> GrowthReport {
        let source = truncate_chars(source_prompt.trim(), self.config.source_max_chars);
        let mut report = GrowthReport { source_prompt: source.clone(), ..GrowthReport::default() };
        let mut touched = Vec::new();

        for (domain, value) in extraction.features() {
            let result = value
                .map_err(RegistryError::from)
                .and_then(|v| self.grow_domain(store, &v, &source, &mut report.batch));
            match result {
                Ok((outcome, t)) => {
                    report.outcomes.insert(domain, outcome);
                    touched.push(t);
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "domain growth failed");
                    report.outcomes.insert(domain, DomainOutcome::Failed { error: e.to_string() });
                }
            }
        }

        if !touched.is_empty() {
            match self.record_full_blend(store, &touched, &source) {
                Ok(blend) => {
                    if self.config.sync_enabled {
                        report.batch.push_blend(blend.clone());
                    }
                    report.full_blend = Some(blend);
                }
                Err(e) => {
                    warn!(error = %e, "full blend not recorded");
                    report.full_blend_error = Some(e.to_string());
                }
            }
        }

        info!(
            added    = report.total_added(),
            repeated = report.repeated_domains().len(),
            failed   = report.failed_domains().len(),
            batch    = report.batch.len(),
            "extraction grown"
        );
        report
    }

    fn grow_domain(
        &self,
        store: &mut RegistryStore,
        value: &FeatureValue,
        source: &str,
        batch: &mut SyncBatch,
    ) -> Result<(DomainOutcome, Touched), RegistryError> {
        match store.ensure_detailed(value, source)? {
            Ensured::Added { entry, blend } => {
                if self.config.sync_enabled {
                    batch.push_entry(EntryPayload::from_entry(&entry, source, self.config.source_max_chars));
                    batch.push_blend(blend);
                }
                let touched = Touched {
                    domain: entry.domain,
                    key:    entry.key.clone(),
                    name:   entry.name.clone(),
                    depth:  entry.depth_breakdown,
                };
                Ok((DomainOutcome::Added { key: entry.key, name: entry.name }, touched))
            }
            Ensured::Repeated { domain, key, count } => {
                let (name, depth) = store
                    .entry(domain, &key)
                    .map(|e| (e.name.clone(), e.depth_breakdown.clone()))
                    .unwrap_or_default();
                debug!(domain = %domain, key = %key, count, "repeat observation");
                let touched = Touched { domain, key: key.clone(), name, depth };
                Ok((DomainOutcome::Repeated { key, count }, touched))
            }
        }
    }

    /// One record joining every domain touched by the extraction, with the
    /// mean of their breakdowns as `primitive_depths`.
    fn record_full_blend(
        &self,
        store: &mut RegistryStore,
        touched: &[Touched],
        source: &str,
    ) -> Result<BlendRecord, RegistryError> {
        let mut inputs = BTreeMap::new();
        let mut depths: BTreeMap<String, f64> = BTreeMap::new();
        let share = 1.0 / touched.len() as f64;

        for t in touched {
            inputs.insert(
                t.domain.to_string(),
                serde_json::json!({ "key": t.key, "name": t.name }),
            );
            for (origin, w) in &t.depth {
                *depths.entry(qualified_origin(t.domain, origin)).or_default() += w * share;
            }
        }
        for w in depths.values_mut() {
            *w = (*w * 10_000.0).round() / 10_000.0;
        }
        depths.retain(|_, w| *w > 0.0);

        let output = touched
            .iter()
            .map(|t| format!("{}:{}", t.domain, t.key))
            .collect::<Vec<_>>()
            .join("+");

        let name = store.allocate_name()?;
        let blend = BlendRecord::new(name, FULL_BLEND, inputs, output, depths, source);
        store.record_blend(blend.clone())?;
        debug!(name = %blend.name, domains = touched.len(), "full blend recorded");
        Ok(blend)
    }
}

/// `domain.origin`; narrative origins already carry their facet prefix.
fn qualified_origin(domain: Domain, origin: &str) -> String {
    if domain.is_narrative() {
        origin.to_string()
    } else {
        format!("{domain}.{origin}")
    }
}
