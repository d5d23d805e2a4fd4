use std::collections::BTreeMap;

use motif_core::Domain;
use motif_registry::{BlendRecord, SyncBatch};
use serde::{Deserialize, Serialize};

/// What happened to one domain of an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DomainOutcome {
    Added { key: String, name: String },
    Repeated { key: String, count: u64 },
    Failed { error: String },
}

/// Result of growing one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthReport {
    pub source_prompt:    String,
    pub outcomes:         BTreeMap<Domain, DomainOutcome>,
    /// The joint record, absent when no domain could be processed.
    pub full_blend:       Option<BlendRecord>,
    /// Set when recording the joint record itself failed.
    pub full_blend_error: Option<String>,
    /// Payloads for the remote store; empty unless sync is enabled.
    pub batch:            SyncBatch,
}

impl GrowthReport {
    /// Entries added per domain (0 or 1 for a single extraction).
    pub fn added(&self) -> BTreeMap<Domain, usize> {
        self.outcomes
            .iter()
            .map(|(d, o)| (*d, usize::from(matches!(o, DomainOutcome::Added { .. }))))
            .collect()
    }

    pub fn total_added(&self) -> usize {
        self.added_domains().len()
    }

    pub fn added_domains(&self) -> Vec<Domain> {
        self.filter(|o| matches!(o, DomainOutcome::Added { .. }))
    }

    pub fn repeated_domains(&self) -> Vec<Domain> {
        self.filter(|o| matches!(o, DomainOutcome::Repeated { .. }))
    }

    pub fn failed_domains(&self) -> Vec<Domain> {
        self.filter(|o| matches!(o, DomainOutcome::Failed { .. }))
    }

    /// New names keyed by domain.
    pub fn new_names(&self) -> BTreeMap<Domain, String> {
        self.outcomes
            .iter()
            .filter_map(|(d, o)| match o {
                DomainOutcome::Added { name, .. } => Some((*d, name.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_domains().is_empty() && self.full_blend_error.is_none()
    }

    fn filter(&self, pred: impl Fn(&DomainOutcome) -> bool) -> Vec<Domain> {
        self.outcomes
            .iter()
            .filter(|(_, o)| pred(o))
            .map(|(d, _)| *d)
            .collect()
    }
}
