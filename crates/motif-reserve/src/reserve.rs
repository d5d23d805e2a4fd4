use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::error::ReserveError;
use crate::generator::{generate_name, MAX_NAME_LEN};
use crate::model::{NamePool, ReserveConfig, ReserveStatus};

/// The name allocator.
///
/// Holds the pool in memory; [`NameReserve::save`] writes it back. Uniqueness
/// is checked against `available`, the bounded `used` history and an
/// externally supplied exclusion set (names already issued to entries).
pub struct NameReserve {
    path:     Option<PathBuf>,
    config:   ReserveConfig,
    pool:     NamePool,
    /// `available ∪ used`.
    index:    HashSet<String>,
    excluded: HashSet<String>,
}

impl NameReserve {
    /// Load the pool file at `path`. A missing or unreadable file yields an
    /// empty pool; the next `take` refills it.
    pub fn open(path: impl Into<PathBuf>, config: ReserveConfig) -> Self {
        let path = path.into();
        let pool = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<NamePool>(&text) {
                Ok(pool) => pool,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "name reserve unreadable, starting empty");
                    NamePool::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => NamePool::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "name reserve unreadable, starting empty");
                NamePool::default()
            }
        };
        let mut reserve = Self::from_pool(pool, config);
        reserve.path = Some(path);
        reserve
    }

    /// A reserve that is never persisted.
    pub fn in_memory(config: ReserveConfig) -> Self {
        Self::from_pool(NamePool::default(), config)
    }

    fn from_pool(mut pool: NamePool, config: ReserveConfig) -> Self {
        let used: HashSet<String> = pool.used.iter().cloned().collect();
        let mut seen = HashSet::new();
        pool.available.retain(|n| !used.contains(n) && seen.insert(n.clone()));

        let mut index = used;
        index.extend(pool.available.iter().cloned());

        Self { path: None, config, pool, index, excluded: HashSet::new() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &ReserveConfig {
        &self.config
    }

    pub fn pool(&self) -> &NamePool {
        &self.pool
    }

    fn is_known(&self, name: &str) -> bool {
        self.index.contains(name) || self.excluded.contains(name)
    }

    /// Mark one externally issued name as taken.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.exclude([name.into()]);
    }

    /// Mark names issued elsewhere (e.g. loaded registry entries) so they are
    /// never handed out again. Removes them from `available` if present.
    pub fn exclude<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.excluded.insert(name.into());
        }
        let excluded = &self.excluded;
        let index = &mut self.index;
        self.pool.available.retain(|n| {
            let keep = !excluded.contains(n);
            if !keep {
                index.remove(n);
            }
            keep
        });
    }

    /// Generate until the pool holds `target_size` names. Returns how many
    /// were added; fewer than requested only if the attempt budget ran out.
    pub fn refill(&mut self, target_size: usize) -> usize {
        let needed = target_size.saturating_sub(self.pool.available.len());
        if needed == 0 {
            return 0;
        }

        let generation = self.pool.generation;
        self.pool.generation += 1;
        let mut rng = StdRng::seed_from_u64(generation);

        let max_attempts = needed.saturating_mul(self.config.max_attempts_per_name.max(1));
        let mut attempts = 0;
        let mut added = 0;
        while self.pool.available.len() < target_size && attempts < max_attempts {
            attempts += 1;
            let name = generate_name(&mut rng);
            if self.is_known(&name) {
                continue;
            }
            self.index.insert(name.clone());
            self.pool.available.push_back(name);
            self.pool.total_generated += 1;
            added += 1;
        }

        debug!(generation, added, attempts, available = self.pool.available.len(), "name reserve refilled");
        if added < needed {
            warn!(needed, added, "name reserve refill fell short of target");
        }
        added
    }

    /// Issue the next name. Never fails: refills below the minimum threshold
    /// and synthesises a name if the pool is still empty.
    pub fn take(&mut self) -> String {
        if self.pool.available.len() < self.config.min_threshold {
            self.refill(self.config.target_size);
        }
        let name = match self.pool.available.pop_front() {
            Some(name) => name,
            None => {
                warn!("name reserve exhausted, synthesising a name");
                self.synthesize()
            }
        };
        self.push_used(name.clone());
        name
    }

    pub fn status(&self) -> ReserveStatus {
        ReserveStatus {
            available:       self.pool.available.len(),
            used:            self.pool.used.len(),
            total_generated: self.pool.total_generated,
        }
    }

    /// Persist the pool as pretty-printed JSON (temp file + rename).
    pub fn save(&self) -> Result<(), ReserveError> {
        let Some(path) = &self.path else { return Ok(()) };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.pool)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn push_used(&mut self, name: String) {
        self.index.insert(name.clone());
        self.pool.used.push_back(name);
        while self.pool.used.len() > self.config.used_cap {
            if let Some(old) = self.pool.used.pop_front() {
                self.index.remove(&old);
            }
        }
    }

    fn synthesize(&mut self) -> String {
        let generation = self.pool.generation;
        self.pool.generation += 1;
        let mut rng = StdRng::seed_from_u64(generation);
        let base = generate_name(&mut rng);

        let mut n: u64 = 0;
        let name = loop {
            let candidate = if n == 0 { base.clone() } else { with_suffix(&base, n) };
            if !self.is_known(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.pool.total_generated += 1;
        name
    }
}

/// `base` with a numeric suffix on its second segment, trimmed to the
/// maximum name length.
fn with_suffix(base: &str, n: u64) -> String {
    let suffix = n.to_string();
    let (a, b) = base.split_once('-').unwrap_or((base, "x"));
    let budget = MAX_NAME_LEN.saturating_sub(1 + suffix.len());
    let a_keep = a.len().min(budget.saturating_sub(1)).max(1);
    let b_keep = b.len().min(budget.saturating_sub(a_keep)).max(1);
    format!("{}-{}{}", &a[..a_keep], &b[..b_keep], suffix)
}
