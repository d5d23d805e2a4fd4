//! Wire shapes for pushing local discoveries to the shared store.
//!
//! ```json
//! {
//!   "static":  [ { "domain": "color", "key": "0_200_25", "name": "velo-marin",
//!                  "dominant_rgb": [12, 200, 40], "count": 1, ... } ],
//!   "blends":  [ { "id": "...", "name": "...", "domain": "full_blend", ... } ]
//! }
//! ```
//!
//! The remote upsert is idempotent on `(domain, key)` and owns count merging,
//! so a batch may be delivered more than once.

use std::collections::BTreeMap;
use std::path::Path;

use motif_core::{DepthBreakdown, Domain, DomainGroup};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::fsio::{read_json, write_json};
use crate::model::{truncate_chars, BlendRecord, RegistryEntry};

/// One newly added entry as the remote store expects it: the identifying
/// fields plus the raw feature fields inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub domain:          Domain,
    pub key:             String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:            Option<String>,
    #[serde(flatten)]
    pub raw:             serde_json::Map<String, serde_json::Value>,
    pub count:           u64,
    #[serde(default)]
    pub depth_breakdown: DepthBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prompt:   Option<String>,
}

impl EntryPayload {
    /// Payload for `entry`, with the provenance cut to `source_max_chars`.
    pub fn from_entry(entry: &RegistryEntry, source_prompt: &str, source_max_chars: usize) -> Self {
        let raw = match &entry.raw_value {
            serde_json::Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        let source = truncate_chars(source_prompt, source_max_chars);
        Self {
            domain:          entry.domain,
            key:             entry.key.clone(),
            name:            Some(entry.name.clone()),
            raw,
            count:           entry.count,
            depth_breakdown: entry.depth_breakdown.clone(),
            source_prompt:   (!source.is_empty()).then_some(source),
        }
    }
}

/// Pending payloads for one push, grouped the way the endpoint wants them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncBatch {
    pub entries: BTreeMap<DomainGroup, Vec<EntryPayload>>,
    pub blends:  Vec<BlendRecord>,
}

impl SyncBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entry(&mut self, payload: EntryPayload) {
        self.entries.entry(payload.domain.group()).or_default().push(payload);
    }

    pub fn push_blend(&mut self, blend: BlendRecord) {
        self.blends.push(blend);
    }

    pub fn merge(&mut self, other: SyncBatch) {
        for (group, payloads) in other.entries {
            self.entries.entry(group).or_default().extend(payloads);
        }
        self.blends.extend(other.blends);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn len(&self) -> usize {
        self.entry_count() + self.blends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the oldest payloads until at most `max` remain and return how
    /// many went. Blend records go before entries; entries leave the
    /// largest group first.
    pub fn trim_to(&mut self, max: usize) -> usize {
        let mut excess = self.len().saturating_sub(max);
        let dropped = excess;

        let blends = excess.min(self.blends.len());
        self.blends.drain(..blends);
        excess -= blends;

        while excess > 0 {
            let Some(largest) = self.entries.values_mut().max_by_key(|v| v.len()) else { break };
            if largest.is_empty() {
                break;
            }
            largest.remove(0);
            excess -= 1;
        }
        self.entries.retain(|_, v| !v.is_empty());
        dropped - excess
    }

    /// Load a batch saved with [`SyncBatch::save`]; missing or unreadable
    /// files give an empty batch.
    pub fn load(path: &Path) -> Self {
        read_json(path).unwrap_or_default()
    }

    /// Persist the batch, or remove the file when there is nothing pending.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        if self.is_empty() {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "pending batch cleared"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        }
        write_json(path, self)
    }

    /// The `POST /discoveries` body: group name → payload list, blends under
    /// `"blends"`. Empty groups are omitted.
    pub fn to_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut body = serde_json::Map::new();
        for (group, payloads) in &self.entries {
            if !payloads.is_empty() {
                body.insert(group.as_str().to_string(), serde_json::to_value(payloads)?);
            }
        }
        if !self.blends.is_empty() {
            body.insert("blends".to_string(), serde_json::to_value(&self.blends)?);
        }
        Ok(serde_json::Value::Object(body))
    }
}
