use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use motif_core::{decompose, origins, Domain, DomainGroup, FeatureValue, Quantizer};
use motif_reserve::{NameReserve, ReserveStatus};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::fsio::{append_jsonl, read_json, write_json};
use crate::model::{
    now_unix, truncate_chars, BlendLog, BlendRecord, Collection, KnowledgePool, KnowledgeSnapshot,
    KnowledgeSource, LearnedEntry, Manifest, ManifestEntry, RegistryEntry, RegistryStats,
    FORMAT_VERSION,
};

/// Outcome of [`RegistryStore::ensure_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured {
    /// The key was new: a name was allocated and an allocation blend logged.
    Added { entry: RegistryEntry, blend: BlendRecord },
    /// The key was known: its count was incremented.
    Repeated { domain: Domain, key: String, count: u64 },
}

impl Ensured {
    pub fn is_added(&self) -> bool {
        matches!(self, Ensured::Added { .. })
    }

    /// The newly allocated name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Ensured::Added { entry, .. } => Some(&entry.name),
            Ensured::Repeated { .. } => None,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Ensured::Added { entry, .. } => &entry.key,
            Ensured::Repeated { key, .. } => key,
        }
    }
}

/// The local discovery registry.
///
/// Owns every collection, the blend log, the manifest and the name reserve
/// for one data directory. Mutations are written through immediately as
/// whole-file rewrites (temp file + rename) without locking: a data
/// directory must have a single writer process.
pub struct RegistryStore {
    config:      RegistryConfig,
    quantizer:   Quantizer,
    collections: BTreeMap<Domain, Collection>,
    blends:      BlendLog,
    manifest:    Manifest,
    reserve:     NameReserve,
}

impl RegistryStore {
    // ── Construction ──────────────────────────────────────────────────────

    /// Open (or create) the registry under `config.root`.
    ///
    /// Unreadable collection files load as empty collections; a missing or
    /// stale manifest is rebuilt from the collections. Failing to create the
    /// directory or to rewrite the manifest is an error.
    pub fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        std::fs::create_dir_all(&config.root)?;

        let mut collections = BTreeMap::new();
        for domain in Domain::ALL {
            let path = config.collection_path(domain);
            let mut collection = match read_json::<Collection>(&path) {
                Some(c) if c.domain == domain => c,
                Some(c) => {
                    warn!(path = %path.display(), found = %c.domain, "collection holds another domain, ignoring");
                    Collection::new(domain)
                }
                None => Collection::new(domain),
            };
            collection.reindex();
            collections.insert(domain, collection);
        }

        let mut blends: BlendLog = read_json(&config.blends_path()).unwrap_or_default();
        blends.version = FORMAT_VERSION;

        let mut reserve = NameReserve::open(config.reserve_path(), config.reserve.clone());
        reserve.exclude(
            collections
                .values()
                .flat_map(|c| c.entries.iter().map(|e| e.name.clone())),
        );

        let loaded: Option<Manifest> = read_json(&config.manifest_path());
        let mut store = Self {
            quantizer: Quantizer::new(config.tolerances.clone()),
            config,
            collections,
            blends,
            manifest: Manifest::default(),
            reserve,
        };

        let rebuilt = store.rebuild_manifest(loaded.as_ref().map(|m| m.updated_at).unwrap_or(0));
        if loaded.as_ref().map(|m| m.domains != rebuilt.domains).unwrap_or(true) {
            info!(root = %store.config.root.display(), "manifest missing or stale, rebuilding");
            store.manifest = rebuilt;
            store.manifest.updated_at = now_unix();
            write_json(&store.config.manifest_path(), &store.manifest)?;
        } else {
            store.manifest = rebuilt;
        }

        info!(
            root    = %store.config.root.display(),
            entries = store.manifest.total_entries(),
            blends  = store.blends.records.len(),
            reserve = store.reserve.status().available,
            "registry opened"
        );
        Ok(store)
    }

    fn rebuild_manifest(&self, updated_at: i64) -> Manifest {
        let domains = self
            .collections
            .iter()
            .map(|(domain, c)| (*domain, self.manifest_entry(c)))
            .collect();
        Manifest { version: FORMAT_VERSION, updated_at, domains }
    }

    fn manifest_entry(&self, c: &Collection) -> ManifestEntry {
        ManifestEntry {
            file:         format!("{}.json", c.domain),
            group:        c.group,
            count:        c.len(),
            last_updated: c.updated_at,
        }
    }

    // ── Growth ────────────────────────────────────────────────────────────

    /// Register one observation of `value`. Returns the new name when the
    /// value's key was not yet known, `None` when it was.
    pub fn ensure(&mut self, value: &FeatureValue, source: &str) -> Result<Option<String>, RegistryError> {
        Ok(match self.ensure_detailed(value, source)? {
            Ensured::Added { entry, .. } => Some(entry.name),
            Ensured::Repeated { .. } => None,
        })
    }

    /// Like [`RegistryStore::ensure`], returning the full outcome.
    pub fn ensure_detailed(&mut self, value: &FeatureValue, source: &str) -> Result<Ensured, RegistryError> {
        value.validate()?;
        let domain = value.domain();
        let key = self.quantizer.key(value);
        let source = truncate_chars(source.trim(), self.config.source_max_chars);
        let now = now_unix();
        let max_sources = self.config.max_sources;

        // Memory is only committed once the collection file is written, so a
        // failed write leaves the key unknown (or its count unchanged).
        let repeated = {
            let collection = self.collection_mut(domain);
            let prev_updated = collection.updated_at;
            match collection.get_mut(&key) {
                Some(entry) => {
                    let before = entry.clone();
                    entry.count += 1;
                    entry.updated_at = now;
                    if !source.is_empty() && entry.sources.len() < max_sources {
                        entry.sources.push(source.clone());
                    }
                    let count = entry.count;
                    collection.updated_at = now;
                    Some((count, before, prev_updated))
                }
                None => None,
            }
        };

        if let Some((count, before, prev_updated)) = repeated {
            if let Err(e) = self.persist_domain(domain) {
                let collection = self.collection_mut(domain);
                if let Some(entry) = collection.get_mut(&key) {
                    *entry = before;
                }
                collection.updated_at = prev_updated;
                return Err(e);
            }
            debug!(domain = %domain, key = %key, count, "known value observed again");
            return Ok(Ensured::Repeated { domain, key, count });
        }

        let name = self.reserve.take();
        self.reserve.save()?;

        let entry = RegistryEntry {
            domain,
            key: key.clone(),
            name: name.clone(),
            raw_value: value.raw_value(),
            count: 1,
            sources: if source.is_empty() { Vec::new() } else { vec![source.clone()] },
            depth_breakdown: decompose(value),
            created_at: now,
            updated_at: now,
        };
        let prev_updated = self.collection_mut(domain).updated_at;
        self.collection_mut(domain).push(entry.clone());
        if let Err(e) = self.persist_domain(domain) {
            let collection = self.collection_mut(domain);
            collection.pop();
            collection.updated_at = prev_updated;
            warn!(domain = %domain, key = %key, name = %name, error = %e, "discovery not persisted, name discarded");
            return Err(e);
        }

        // The entry is committed; a blend log failure no longer undoes it.
        let blend = BlendRecord::allocation(&entry, &source);
        if let Err(e) = self.append_blend(blend.clone()) {
            warn!(domain = %domain, name = %name, error = %e, "allocation blend not logged");
        }

        info!(domain = %domain, key = %key, name = %name, "new discovery registered");
        Ok(Ensured::Added { entry, blend })
    }

    fn collection_mut(&mut self, domain: Domain) -> &mut Collection {
        self.collections.entry(domain).or_insert_with(|| Collection::new(domain))
    }

    /// Rewrite one collection file, then its manifest row.
    ///
    /// Only the collection write can fail the call. The manifest is derived
    /// data and is rebuilt on the next `open` when it lags behind.
    fn persist_domain(&mut self, domain: Domain) -> Result<(), RegistryError> {
        let Some(collection) = self.collections.get(&domain) else { return Ok(()) };
        write_json(&self.config.collection_path(domain), collection)?;

        let row = self.manifest_entry(collection);
        self.manifest.domains.insert(domain, row);
        self.manifest.version = FORMAT_VERSION;
        self.manifest.updated_at = now_unix();
        if let Err(e) = write_json(&self.config.manifest_path(), &self.manifest) {
            warn!(domain = %domain, error = %e, "manifest not rewritten");
        }
        Ok(())
    }

    // ── Blends ────────────────────────────────────────────────────────────

    /// Append a blend record to the audit log.
    pub fn record_blend(&mut self, record: BlendRecord) -> Result<(), RegistryError> {
        self.append_blend(record)
    }

    /// On a failed write the in-memory log is left as it was.
    fn append_blend(&mut self, record: BlendRecord) -> Result<(), RegistryError> {
        let before = self.blends.clone();
        let result = self.push_blend(record);
        if result.is_err() {
            self.blends = before;
        }
        result
    }

    fn push_blend(&mut self, record: BlendRecord) -> Result<(), RegistryError> {
        self.blends.records.push_back(record);
        self.blends.total_recorded += 1;

        let overflow = self.blends.records.len().saturating_sub(self.config.blend_capacity);
        if overflow > 0 {
            let dropped: Vec<BlendRecord> = self.blends.records.drain(..overflow).collect();
            if self.config.archive_dropped_blends {
                append_jsonl(&self.config.blends_archive_path(), &dropped)?;
            }
            self.blends.archived += dropped.len() as u64;
            debug!(dropped = dropped.len(), archived = self.config.archive_dropped_blends, "blend log trimmed");
        }

        write_json(&self.config.blends_path(), &self.blends)
    }

    /// Most recent blend records, oldest first.
    pub fn blends(&self) -> &VecDeque<BlendRecord> {
        &self.blends.records
    }

    pub fn blend_log(&self) -> &BlendLog {
        &self.blends
    }

    // ── Names ─────────────────────────────────────────────────────────────

    /// Issue a fresh name outside of `ensure` (e.g. for joint blends).
    pub fn allocate_name(&mut self) -> Result<String, RegistryError> {
        let name = self.reserve.take();
        self.reserve.save()?;
        Ok(name)
    }

    pub fn reserve_status(&self) -> ReserveStatus {
        self.reserve.status()
    }

    /// Top the name pool up to its configured target and persist it.
    pub fn refill_reserve(&mut self) -> Result<usize, RegistryError> {
        let added = self.reserve.refill(self.config.reserve.target_size);
        self.reserve.save()?;
        Ok(added)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn entry(&self, domain: Domain, key: &str) -> Option<&RegistryEntry> {
        self.collections.get(&domain).and_then(|c| c.get(key))
    }

    pub fn entries(&self, domain: Domain) -> &[RegistryEntry] {
        self.collections
            .get(&domain)
            .map(|c| c.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, domain: Domain) -> usize {
        self.collections.get(&domain).map(Collection::len).unwrap_or(0)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn stats(&self) -> RegistryStats {
        let mut per_domain = BTreeMap::new();
        let mut per_group: BTreeMap<DomainGroup, usize> = BTreeMap::new();
        for (domain, c) in &self.collections {
            per_domain.insert(*domain, c.len());
            *per_group.entry(domain.group()).or_default() += c.len();
        }
        RegistryStats {
            total_entries:   per_domain.values().sum(),
            per_domain,
            per_group,
            blends_logged:   self.blends.records.len(),
            blends_recorded: self.blends.total_recorded,
            blends_archived: self.blends.archived,
            reserve:         self.reserve.status(),
        }
    }

    /// Learned entries (most observed first, at most `max_per_domain`) and
    /// origin names for every domain, built from local state only.
    pub fn knowledge_snapshot(&self, max_per_domain: usize) -> KnowledgeSnapshot {
        let mut domains = BTreeMap::new();
        for domain in Domain::ALL {
            let mut learned: Vec<&RegistryEntry> = self.entries(domain).iter().collect();
            learned.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.created_at.cmp(&b.created_at)));
            let learned = learned
                .into_iter()
                .take(max_per_domain)
                .map(|e| LearnedEntry {
                    name:            e.name.clone(),
                    key:             e.key.clone(),
                    count:           e.count,
                    depth_breakdown: e.depth_breakdown.clone(),
                })
                .collect();

            let origin_names: Vec<String> = if domain.is_narrative() {
                origins::narrative_facet(domain.as_str()).map(|o| o.name.to_string()).collect()
            } else {
                origins::origins(domain.origin_domain()).map(|o| o.name.to_string()).collect()
            };

            domains.insert(domain.as_str().to_string(), KnowledgePool { learned, origins: origin_names });
        }
        KnowledgeSnapshot { source: KnowledgeSource::Local, generated_at: now_unix(), domains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_core::ColorFeatures;
    use tempfile::TempDir;

    fn color(r: f64, g: f64, b: f64) -> FeatureValue {
        FeatureValue::Color(ColorFeatures { dominant_rgb: Some([r, g, b]), ..Default::default() })
    }

    fn open(dir: &TempDir) -> RegistryStore {
        let mut cfg = RegistryConfig::new(dir.path());
        cfg.reserve.target_size = 40;
        cfg.reserve.min_threshold = 5;
        RegistryStore::open(cfg).unwrap()
    }

    #[test]
    fn ensure_twice_allocates_once() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);

        let first = store.ensure(&color(12.0, 200.0, 40.0), "first prompt").unwrap();
        assert!(first.is_some());
        let second = store.ensure(&color(12.0, 200.0, 40.0), "second prompt").unwrap();
        assert!(second.is_none());

        let entry = store.entry(Domain::Color, "0_200_25").unwrap();
        assert_eq!(entry.count, 2);
        assert_eq!(entry.sources, vec!["first prompt", "second prompt"]);
        assert_eq!(Some(entry.name.clone()), first);
        assert_eq!(store.blends().len(), 1);
    }

    #[test]
    fn values_within_tolerance_share_an_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.ensure(&color(10.0, 10.0, 10.0), "a").unwrap();
        store.ensure(&color(20.0, 20.0, 20.0), "b").unwrap();
        assert_eq!(store.count(Domain::Color), 1);
        assert_eq!(store.entries(Domain::Color)[0].count, 2);
    }

    #[test]
    fn sources_are_capped_and_truncated() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let long = "p".repeat(500);
        for i in 0..8 {
            store.ensure(&color(0.0, 0.0, 0.0), &format!("{i}{long}")).unwrap();
        }
        let entry = &store.entries(Domain::Color)[0];
        assert_eq!(entry.count, 8);
        assert_eq!(entry.sources.len(), 5);
        assert!(entry.sources.iter().all(|s| s.chars().count() == 120));
        assert!(entry.sources[0].starts_with('0'));
    }

    #[test]
    fn invalid_value_is_rejected_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let err = store.ensure(&color(f64::NAN, 0.0, 0.0), "x").unwrap_err();
        assert!(matches!(err, RegistryError::Feature(_)));
        assert_eq!(store.count(Domain::Color), 0);
        assert_eq!(store.reserve_status().used, 0);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let name = {
            let mut store = open(&dir);
            store.ensure(&color(250.0, 0.0, 0.0), "red").unwrap().unwrap()
        };
        let mut store = open(&dir);
        assert_eq!(store.entry(Domain::Color, "250_0_0").map(|e| e.name.clone()), Some(name.clone()));
        assert_eq!(store.manifest().domains[&Domain::Color].count, 1);
        assert!(store.ensure(&color(250.0, 0.0, 0.0), "again").unwrap().is_none());
        for _ in 0..60 {
            assert_ne!(store.allocate_name().unwrap(), name);
        }
    }

    #[test]
    fn corrupt_collection_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("color.json"), "{{{ nope").unwrap();
        let mut store = open(&dir);
        assert_eq!(store.count(Domain::Color), 0);
        assert!(store.ensure(&color(1.0, 2.0, 3.0), "x").unwrap().is_some());
    }

    #[test]
    fn missing_manifest_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = open(&dir);
            store.ensure(&color(1.0, 2.0, 3.0), "x").unwrap();
            store.ensure(&color(100.0, 2.0, 3.0), "y").unwrap();
        }
        std::fs::remove_file(dir.path().join("manifest.json")).unwrap();

        let store = open(&dir);
        assert_eq!(store.manifest().domains[&Domain::Color].count, 2);
        assert_eq!(store.manifest().domains[&Domain::Color].file, "color.json");
        let on_disk: Manifest = read_json(&dir.path().join("manifest.json")).unwrap();
        assert_eq!(on_disk.total_entries(), 2);
    }

    /// A directory squatting on the temp path makes the next collection
    /// write fail, whoever runs the test.
    fn block_writes(dir: &TempDir, domain: &str) -> std::path::PathBuf {
        let tmp = dir.path().join(format!("{domain}.json.tmp"));
        std::fs::create_dir_all(tmp.join("locked")).unwrap();
        tmp
    }

    #[test]
    fn failed_write_leaves_key_unknown() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let blocker = block_writes(&dir, "color");

        let err = store.ensure_detailed(&color(12.0, 200.0, 40.0), "first").unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)), "{err:?}");
        assert_eq!(store.count(Domain::Color), 0);
        assert!(store.entry(Domain::Color, "0_200_25").is_none());
        assert!(store.blends().is_empty());
        assert!(!dir.path().join("blends.json").exists());

        std::fs::remove_dir_all(blocker).unwrap();
        let retried = store.ensure_detailed(&color(12.0, 200.0, 40.0), "second").unwrap();
        assert!(retried.is_added());
        assert_eq!(store.entry(Domain::Color, "0_200_25").unwrap().count, 1);
        assert_eq!(store.blends().len(), 1);

        let reopened = open(&dir);
        assert_eq!(reopened.entry(Domain::Color, "0_200_25").unwrap().sources, vec!["second"]);
    }

    #[test]
    fn failed_write_keeps_repeat_count() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.ensure(&color(0.0, 0.0, 0.0), "a").unwrap();
        let blocker = block_writes(&dir, "color");

        assert!(store.ensure(&color(0.0, 0.0, 0.0), "b").is_err());
        let entry = store.entry(Domain::Color, "0_0_0").unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.sources, vec!["a"]);

        std::fs::remove_dir_all(blocker).unwrap();
        match store.ensure_detailed(&color(0.0, 0.0, 0.0), "c").unwrap() {
            Ensured::Repeated { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.entry(Domain::Color, "0_0_0").unwrap().sources, vec!["a", "c"]);
    }

    #[test]
    fn failed_blend_write_does_not_grow_the_log() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let blocker = block_writes(&dir, "blends");

        let rec = BlendRecord::new("b0", "full_blend", BTreeMap::new(), "k", BTreeMap::new(), "");
        assert!(store.record_blend(rec).is_err());
        assert!(store.blends().is_empty());
        assert_eq!(store.blend_log().total_recorded, 0);

        // entries still commit while the blend log cannot be written
        assert!(store.ensure(&color(9.0, 9.0, 9.0), "x").unwrap().is_some());
        assert_eq!(store.count(Domain::Color), 1);
        std::fs::remove_dir_all(blocker).unwrap();
    }

    #[test]
    fn blend_ring_archives_overflow() {
        let dir = TempDir::new().unwrap();
        let mut cfg = RegistryConfig::new(dir.path());
        cfg.blend_capacity = 3;
        let mut store = RegistryStore::open(cfg).unwrap();

        for i in 0..5 {
            let rec = BlendRecord::new(format!("b{i}"), "full_blend", BTreeMap::new(), "k", BTreeMap::new(), "");
            store.record_blend(rec).unwrap();
        }
        assert_eq!(store.blends().len(), 3);
        assert_eq!(store.blends().front().map(|b| b.name.as_str()), Some("b2"));
        assert_eq!(store.blend_log().total_recorded, 5);
        assert_eq!(store.blend_log().archived, 2);

        let archive = std::fs::read_to_string(dir.path().join("blends_archive.jsonl")).unwrap();
        let names: Vec<String> = archive
            .lines()
            .map(|l| serde_json::from_str::<BlendRecord>(l).unwrap().name)
            .collect();
        assert_eq!(names, vec!["b0", "b1"]);
    }

    #[test]
    fn knowledge_snapshot_orders_by_count() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.ensure(&color(0.0, 0.0, 0.0), "a").unwrap();
        store.ensure(&color(200.0, 0.0, 0.0), "b").unwrap();
        store.ensure(&color(200.0, 0.0, 0.0), "c").unwrap();

        let snap = store.knowledge_snapshot(1);
        assert_eq!(snap.source, KnowledgeSource::Local);
        let color = &snap.domains["color"];
        assert_eq!(color.learned.len(), 1);
        assert_eq!(color.learned[0].key, "200_0_0");
        assert!(color.origins.iter().any(|o| o == "green"));
        assert!(snap.domains["mood"].origins.iter().all(|o| o.starts_with("mood.")));
    }

    #[test]
    fn stats_group_counts() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.ensure(&color(0.0, 0.0, 0.0), "a").unwrap();
        let stats = store.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.per_group[&DomainGroup::Static], 1);
        assert_eq!(stats.per_group[&DomainGroup::Narrative], 0);
        assert_eq!(stats.blends_logged, 1);
        assert_eq!(stats.reserve.used, 1);
    }
}
