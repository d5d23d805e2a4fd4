use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Persisted state of the reserve.
///
/// Invariant: no name appears in both `available` and `used`, and no name is
/// ever issued twice while it is still remembered by either list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamePool {
    /// Names waiting to be issued, oldest first.
    pub available:       VecDeque<String>,
    /// Issued names, oldest first, trimmed to `ReserveConfig::used_cap`.
    pub used:            VecDeque<String>,
    /// Every name ever generated, including synthesised fallbacks.
    pub total_generated: u64,
    /// Monotonic counter seeding each refill.
    pub generation:      u64,
}

/// Tuning for the reserve.
#[derive(Debug, Clone)]
pub struct ReserveConfig {
    /// Pool size a refill aims for.
    pub target_size:   usize,
    /// `take` refills first when the pool is below this.
    pub min_threshold: usize,
    /// Maximum length of the used history.
    pub used_cap:      usize,
    /// Draws per requested name before a refill gives up.
    pub max_attempts_per_name: usize,
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            target_size:           500,
            min_threshold:         50,
            used_cap:              50_000,
            max_attempts_per_name: 20,
        }
    }
}

impl ReserveConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        fn env_usize(key: &str, default: usize) -> usize {
            std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        let d = Self::default();
        Self {
            target_size:           env_usize("MOTIF_RESERVE_TARGET", d.target_size),
            min_threshold:         env_usize("MOTIF_RESERVE_MIN", d.min_threshold),
            used_cap:              env_usize("MOTIF_RESERVE_USED_CAP", d.used_cap),
            max_attempts_per_name: d.max_attempts_per_name,
        }
    }
}

/// Snapshot returned by `NameReserve::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStatus {
    pub available:       usize,
    pub used:            usize,
    pub total_generated: u64,
}
