use std::collections::{BTreeMap, HashMap, VecDeque};

use motif_core::{DepthBreakdown, Domain, DomainGroup};
use motif_reserve::ReserveStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current on-disk format version of collections, blends and manifest.
pub const FORMAT_VERSION: u32 = 1;

pub(crate) fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ─────────────────────────────────────────────
// RegistryEntry / Collection
// ─────────────────────────────────────────────

/// One discovered value. Never deleted; only `count`, `sources` and
/// `updated_at` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub domain:          Domain,
    pub key:             String,
    pub name:            String,
    pub raw_value:       serde_json::Value,
    pub count:           u64,
    #[serde(default)]
    pub sources:         Vec<String>,
    #[serde(default)]
    pub depth_breakdown: DepthBreakdown,
    pub created_at:      i64,
    #[serde(default)]
    pub updated_at:      i64,
}

/// The persisted collection of one domain (`<domain>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub domain:     Domain,
    pub group:      DomainGroup,
    #[serde(default)]
    pub version:    u32,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub count:      usize,
    #[serde(default)]
    pub entries:    Vec<RegistryEntry>,
    /// key → position in `entries`
    #[serde(skip)]
    index:          HashMap<String, usize>,
}

impl Collection {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            group: domain.group(),
            version: FORMAT_VERSION,
            updated_at: 0,
            count: 0,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Rebuild the key index after deserialization. Later duplicates of a
    /// key are dropped.
    pub(crate) fn reindex(&mut self) {
        let mut index = HashMap::with_capacity(self.entries.len());
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if index.contains_key(&entry.key) {
                continue;
            }
            index.insert(entry.key.clone(), kept.len());
            kept.push(entry);
        }
        self.entries = kept;
        self.index = index;
        self.count = self.entries.len();
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut RegistryEntry> {
        match self.index.get(key) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    pub(crate) fn push(&mut self, entry: RegistryEntry) {
        self.index.insert(entry.key.clone(), self.entries.len());
        self.updated_at = entry.updated_at.max(entry.created_at);
        self.entries.push(entry);
        self.count = self.entries.len();
    }

    /// Undo the most recent [`Collection::push`].
    pub(crate) fn pop(&mut self) -> Option<RegistryEntry> {
        let entry = self.entries.pop()?;
        self.index.remove(&entry.key);
        self.count = self.entries.len();
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────
// Blends
// ─────────────────────────────────────────────

/// A discovery event: one allocation, or one joint combination across
/// several domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendRecord {
    pub id:               Uuid,
    pub name:             String,
    /// A domain name, or `"full_blend"` for joint records.
    pub domain:           String,
    pub inputs:           BTreeMap<String, serde_json::Value>,
    pub output:           String,
    pub primitive_depths: BTreeMap<String, f64>,
    pub source_prompt:    String,
    pub timestamp:        i64,
}

impl BlendRecord {
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        inputs: BTreeMap<String, serde_json::Value>,
        output: impl Into<String>,
        primitive_depths: BTreeMap<String, f64>,
        source_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: domain.into(),
            inputs,
            output: output.into(),
            primitive_depths,
            source_prompt: source_prompt.into(),
            timestamp: now_unix(),
        }
    }

    /// The record written when `entry` is first allocated.
    pub fn allocation(entry: &RegistryEntry, source_prompt: &str) -> Self {
        let mut inputs = BTreeMap::new();
        inputs.insert(entry.domain.to_string(), entry.raw_value.clone());
        Self::new(
            entry.name.clone(),
            entry.domain.as_str(),
            inputs,
            entry.key.clone(),
            entry.depth_breakdown.clone(),
            source_prompt,
        )
    }
}

/// `blends.json`: a ring of the most recent records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendLog {
    pub version:        u32,
    /// Records ever appended, including trimmed ones.
    pub total_recorded: u64,
    /// Records trimmed from the ring (and archived when enabled).
    pub archived:       u64,
    pub records:        VecDeque<BlendRecord>,
}

// ─────────────────────────────────────────────
// Manifest
// ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file:         String,
    pub group:        DomainGroup,
    pub count:        usize,
    pub last_updated: i64,
}

/// `manifest.json`: per-domain file, count and last update. Derived data;
/// rebuilt from the collections whenever it is missing or stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub version:    u32,
    pub updated_at: i64,
    pub domains:    BTreeMap<Domain, ManifestEntry>,
}

impl Manifest {
    pub fn total_entries(&self) -> usize {
        self.domains.values().map(|e| e.count).sum()
    }
}

// ─────────────────────────────────────────────
// Stats / knowledge
// ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_entries:   usize,
    pub per_domain:      BTreeMap<Domain, usize>,
    pub per_group:       BTreeMap<DomainGroup, usize>,
    pub blends_logged:   usize,
    pub blends_recorded: u64,
    pub blends_archived: u64,
    pub reserve:         ReserveStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnedEntry {
    pub name:            String,
    pub key:             String,
    pub count:           u64,
    pub depth_breakdown: DepthBreakdown,
}

/// What the creative side may draw from for one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgePool {
    /// Most observed first.
    pub learned: Vec<LearnedEntry>,
    pub origins: Vec<String>,
}

/// Learned and origin pools per domain, as served by the remote
/// `/knowledge/for-creation` endpoint or built locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSnapshot {
    pub source:       KnowledgeSource,
    pub generated_at: i64,
    pub domains:      BTreeMap<String, KnowledgePool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> RegistryEntry {
        RegistryEntry {
            domain:          Domain::Color,
            key:             key.to_string(),
            name:            format!("n-{key}"),
            raw_value:       serde_json::json!({}),
            count:           1,
            sources:         vec![],
            depth_breakdown: DepthBreakdown::new(),
            created_at:      10,
            updated_at:      10,
        }
    }

    #[test]
    fn reindex_drops_duplicate_keys() {
        let mut c = Collection::new(Domain::Color);
        c.entries = vec![entry("a"), entry("b"), entry("a")];
        c.reindex();
        assert_eq!(c.len(), 2);
        assert_eq!(c.count, 2);
        assert_eq!(c.get("b").map(|e| e.name.as_str()), Some("n-b"));
    }

    #[test]
    fn collection_json_has_no_index() {
        let mut c = Collection::new(Domain::Mood);
        c.push(entry("x"));
        let v = serde_json::to_value(&c).unwrap();
        assert!(v.get("index").is_none());
        assert_eq!(v["group"], "narrative");
        assert_eq!(v["count"], 1);
    }

    #[test]
    fn allocation_blend_uses_domain_and_key() {
        let e = entry("0_200_25");
        let b = BlendRecord::allocation(&e, "a prompt");
        assert_eq!(b.domain, "color");
        assert_eq!(b.output, "0_200_25");
        assert!(b.inputs.contains_key("color"));
        assert_eq!(b.source_prompt, "a prompt");
    }

    #[test]
    fn truncate_is_char_aware() {
        assert_eq!(truncate_chars("ééééé", 3), "ééé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
