use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of `POST /discoveries`: entries applied per domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReceipt {
    #[serde(default)]
    pub results: BTreeMap<String, u64>,
}

impl DiscoveryReceipt {
    pub fn total(&self) -> u64 {
        self.results.values().sum()
    }
}

/// One page of a backfill maintenance call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillPage {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillKind {
    /// Assign names to remote entries that lack one.
    Names,
    /// Compute depth breakdowns for remote entries that lack one.
    Depths,
}

impl BackfillKind {
    pub fn path(self) -> &'static str {
        match self {
            BackfillKind::Names => "/registries/backfill-names",
            BackfillKind::Depths => "/registries/backfill-depths",
        }
    }
}

/// Why a backfill loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillStop {
    Complete,
    /// A page processed nothing while work remained.
    Stalled,
    PageCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub kind:      BackfillKind,
    pub pages:     usize,
    pub processed: u64,
    pub remaining: u64,
    pub stop:      BackfillStop,
}
