//! Worker configuration loaded from environment variables.
//!
//! | Variable                 | Default            | Description                                       |
//! |--------------------------|--------------------|---------------------------------------------------|
//! | `MOTIF_DATA_DIR`         | `data/motif`       | Registry directory                                |
//! | `MOTIF_INBOX_DIR`        | `<data_dir>/inbox` | Directory polled for `*.json` jobs                |
//! | `MOTIF_LOOP_DELAY_SECS`  | `5`                | Pause between cycles                              |
//! | `MOTIF_LOG_LEVEL`        | `info`             | tracing filter (trace/debug/info/warn/error)      |
//! | `MOTIF_SYNC_ENABLED`     | `false`            | Push discoveries to the shared store              |
//! | `MOTIF_SYNC_PENDING_CAP` | `5000`             | Payloads kept while the shared store is down      |
//! | `MOTIF_WORKER_MODE`      | `loop`             | `loop`, or `backfill` to run maintenance and exit |
//!
//! Flags accept `1/true/yes/on` and `0/false/no/off`. Registry, tolerance,
//! reserve and sync settings read their own `MOTIF_*` variables (see
//! `RegistryConfig::from_env` and `SyncConfig::from_env`).

use std::path::PathBuf;
use std::time::Duration;

use motif_core::parse_flag;
use motif_growth::GrowthConfig;
use motif_registry::RegistryConfig;
use motif_sync::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    Loop,
    Backfill,
}

/// Runtime configuration for the worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub mode:         WorkerMode,
    pub inbox_dir:    PathBuf,
    pub loop_delay:   Duration,
    pub log_level:    String,
    pub sync_enabled: bool,
    pub pending_cap:  usize,
    pub registry:     RegistryConfig,
    pub growth:       GrowthConfig,
    pub sync:         SyncConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables, applying defaults where
    /// a variable is absent or unparseable.
    pub fn from_env() -> Self {
        Self::from_vars(
            |key| std::env::var(key).ok(),
            RegistryConfig::from_env(),
            SyncConfig::from_env(),
        )
    }

    /// Resolve the worker's own variables through `var`.
    fn from_vars<F>(var: F, registry: RegistryConfig, sync: SyncConfig) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let env_bool = |key: &str| var(key).and_then(|v| parse_flag(&v)).unwrap_or(false);
        let env_u64 = |key: &str, default: u64| var(key).and_then(|v| v.parse().ok()).unwrap_or(default);

        let sync_enabled = env_bool("MOTIF_SYNC_ENABLED");
        let inbox_dir = var("MOTIF_INBOX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| registry.root.join("inbox"));
        let mode = match env_str("MOTIF_WORKER_MODE", "loop").to_ascii_lowercase().as_str() {
            "backfill" => WorkerMode::Backfill,
            _ => WorkerMode::Loop,
        };

        Self {
            mode,
            inbox_dir,
            loop_delay:   Duration::from_secs(env_u64("MOTIF_LOOP_DELAY_SECS", 5)),
            log_level:    env_str("MOTIF_LOG_LEVEL", "info"),
            sync_enabled,
            pending_cap:  env_u64("MOTIF_SYNC_PENDING_CAP", 5_000) as usize,
            registry,
            growth:       GrowthConfig { sync_enabled, ..GrowthConfig::default() },
            sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WorkerConfig::from_vars(
            |key| vars.get(key).cloned(),
            RegistryConfig::new("/srv/motif"),
            SyncConfig::default(),
        )
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = load(&[]);
        assert_eq!(cfg.mode, WorkerMode::Loop);
        assert_eq!(cfg.inbox_dir, PathBuf::from("/srv/motif/inbox"));
        assert_eq!(cfg.loop_delay, Duration::from_secs(5));
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.sync_enabled);
        assert_eq!(cfg.pending_cap, 5_000);
    }

    #[test]
    fn overrides_applied() {
        let cfg = load(&[
            ("MOTIF_LOOP_DELAY_SECS", "42"),
            ("MOTIF_INBOX_DIR", "/tmp/motif-inbox"),
            ("MOTIF_WORKER_MODE", "Backfill"),
            ("MOTIF_SYNC_PENDING_CAP", "10"),
        ]);
        assert_eq!(cfg.loop_delay, Duration::from_secs(42));
        assert_eq!(cfg.inbox_dir, PathBuf::from("/tmp/motif-inbox"));
        assert_eq!(cfg.mode, WorkerMode::Backfill);
        assert_eq!(cfg.pending_cap, 10);
    }

    #[test]
    fn sync_flag_matches_growth_flag_spelling() {
        for on in ["1", "true", "yes", "on"] {
            let cfg = load(&[("MOTIF_SYNC_ENABLED", on)]);
            assert!(cfg.sync_enabled, "{on}");
            assert!(cfg.growth.sync_enabled, "{on}");
        }
        assert!(!load(&[("MOTIF_SYNC_ENABLED", "off")]).sync_enabled);
    }
}
