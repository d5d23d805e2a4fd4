use std::path::PathBuf;

use motif_core::{env_flag, Tolerances};
use motif_reserve::ReserveConfig;

/// Configuration for a [`crate::RegistryStore`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding every registry file.
    pub root:                  PathBuf,
    pub tolerances:            Tolerances,
    /// Provenance strings kept per entry; later ones are dropped.
    pub max_sources:           usize,
    /// Provenance strings are cut to this many characters.
    pub source_max_chars:      usize,
    /// Blend records kept in `blends.json`.
    pub blend_capacity:        usize,
    /// Append blend records trimmed from the ring to `blends_archive.jsonl`.
    pub archive_dropped_blends: bool,
    pub reserve:               ReserveConfig,
}

impl RegistryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:                   root.into(),
            tolerances:             Tolerances::default(),
            max_sources:            5,
            source_max_chars:       120,
            blend_capacity:         2000,
            archive_dropped_blends: true,
            reserve:                ReserveConfig::default(),
        }
    }

    /// Build from environment variables, falling back to defaults.
    ///
    /// | Variable               | Default        |
    /// |------------------------|----------------|
    /// | `MOTIF_DATA_DIR`       | `data/motif`   |
    /// | `MOTIF_BLEND_CAPACITY` | `2000`         |
    /// | `MOTIF_ARCHIVE_BLENDS` | `true`         |
    ///
    /// Tolerances and reserve tuning read their own `MOTIF_*` variables.
    pub fn from_env() -> Self {
        let root = std::env::var("MOTIF_DATA_DIR").unwrap_or_else(|_| "data/motif".to_string());
        let mut cfg = Self::new(root);
        cfg.tolerances = Tolerances::from_env();
        cfg.reserve = ReserveConfig::from_env();
        if let Some(n) = std::env::var("MOTIF_BLEND_CAPACITY").ok().and_then(|v| v.parse().ok()) {
            cfg.blend_capacity = n;
        }
        cfg.archive_dropped_blends = env_flag("MOTIF_ARCHIVE_BLENDS", cfg.archive_dropped_blends);
        cfg
    }

    pub fn collection_path(&self, domain: motif_core::Domain) -> PathBuf {
        self.root.join(format!("{domain}.json"))
    }

    pub fn blends_path(&self) -> PathBuf {
        self.root.join("blends.json")
    }

    pub fn blends_archive_path(&self) -> PathBuf {
        self.root.join("blends_archive.jsonl")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn reserve_path(&self) -> PathBuf {
        self.root.join("name_reserve.json")
    }

    /// Payloads not yet accepted by the shared store.
    pub fn pending_sync_path(&self) -> PathBuf {
        self.root.join("pending_sync.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_core::Domain;

    #[test]
    fn file_layout() {
        let cfg = RegistryConfig::new("/tmp/reg");
        assert_eq!(cfg.collection_path(Domain::AudioRole), PathBuf::from("/tmp/reg/audio_role.json"));
        assert_eq!(cfg.manifest_path(), PathBuf::from("/tmp/reg/manifest.json"));
        assert_eq!(cfg.reserve_path(), PathBuf::from("/tmp/reg/name_reserve.json"));
    }

    #[test]
    fn defaults() {
        let cfg = RegistryConfig::new("x");
        assert_eq!(cfg.max_sources, 5);
        assert_eq!(cfg.source_max_chars, 120);
        assert_eq!(cfg.blend_capacity, 2000);
        assert!(cfg.archive_dropped_blends);
    }
}
