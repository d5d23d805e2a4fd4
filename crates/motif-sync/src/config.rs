use crate::error::SyncError;

/// Configuration for [`crate::SyncClient`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the shared store, without a trailing path.
    pub base_url:             String,
    pub api_key:              Option<String>,
    /// Per-request timeout.
    pub timeout_secs:         u64,
    /// Retries after the first attempt.
    pub max_retries:          u32,
    /// Upper bound of the random pause before a hot endpoint. 0 disables it.
    pub max_jitter_ms:        u64,
    /// Capacity-exhaustion backoff, multiplied by the attempt number.
    pub capacity_backoff_ms:  u64,
    /// Generic backoff: `base + attempt × increment`.
    pub base_backoff_ms:      u64,
    pub backoff_increment_ms: u64,
    /// Longest server-requested `Retry-After` that is honoured.
    pub max_retry_after_ms:   u64,
    /// Lower-case substrings of an error body that signal the backend ran
    /// out of CPU or time budget.
    pub capacity_markers:     Vec<String>,
    /// Paths hit by every worker; each call is preceded by jitter.
    pub hot_paths:            Vec<String>,
    pub backfill_page_size:   usize,
    pub backfill_max_pages:   usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url:             "http://localhost:8787".to_string(),
            api_key:              None,
            timeout_secs:         30,
            max_retries:          3,
            max_jitter_ms:        8_000,
            capacity_backoff_ms:  10_000,
            base_backoff_ms:      1_000,
            backoff_increment_ms: 2_000,
            max_retry_after_ms:   120_000,
            capacity_markers:     [
                "cpu time limit exceeded",
                "exceeded cpu time",
                "exceeded resource limits",
                "overloaded",
                "out of capacity",
            ]
                .into_iter()
                .map(String::from)
                .collect(),
            hot_paths:            vec!["/discoveries".to_string(), "/knowledge/for-creation".to_string()],
            backfill_page_size:   100,
            backfill_max_pages:   500,
        }
    }
}

impl SyncConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// | Variable                        | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `MOTIF_SYNC_URL`                | `http://localhost:8787` |
    /// | `MOTIF_SYNC_API_KEY`            | unset                   |
    /// | `MOTIF_SYNC_TIMEOUT_SECS`       | `30`                    |
    /// | `MOTIF_SYNC_MAX_RETRIES`        | `3`                     |
    /// | `MOTIF_SYNC_MAX_JITTER_MS`      | `8000`                  |
    /// | `MOTIF_SYNC_MAX_RETRY_AFTER_MS` | `120000`                |
    /// | `MOTIF_SYNC_BACKFILL_LIMIT`     | `100`                   |
    pub fn from_env() -> Self {
        fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        let d = Self::default();
        Self {
            base_url:           std::env::var("MOTIF_SYNC_URL").unwrap_or(d.base_url.clone()),
            api_key:            std::env::var("MOTIF_SYNC_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs:       env_parse("MOTIF_SYNC_TIMEOUT_SECS", d.timeout_secs),
            max_retries:        env_parse("MOTIF_SYNC_MAX_RETRIES", d.max_retries),
            max_jitter_ms:      env_parse("MOTIF_SYNC_MAX_JITTER_MS", d.max_jitter_ms),
            max_retry_after_ms: env_parse("MOTIF_SYNC_MAX_RETRY_AFTER_MS", d.max_retry_after_ms),
            backfill_page_size: env_parse("MOTIF_SYNC_BACKFILL_LIMIT", d.backfill_page_size),
            ..d
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.base_url.is_empty() {
            return Err(SyncError::Config("base_url cannot be empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SyncError::Config(format!("base_url must be http(s): {}", self.base_url)));
        }
        if self.timeout_secs == 0 {
            return Err(SyncError::Config("timeout_secs must be > 0".to_string()));
        }
        if self.backfill_page_size == 0 {
            return Err(SyncError::Config("backfill_page_size must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn is_hot(&self, path: &str) -> bool {
        self.hot_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        let cfg = SyncConfig { base_url: "ftp://x".into(), ..SyncConfig::default() };
        assert!(matches!(cfg.validate(), Err(SyncError::Config(_))));
        let cfg = SyncConfig { base_url: String::new(), ..SyncConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn hot_paths() {
        let cfg = SyncConfig::default();
        assert!(cfg.is_hot("/discoveries"));
        assert!(cfg.is_hot("/knowledge/for-creation"));
        assert!(!cfg.is_hot("/registries/backfill-names?limit=10"));
    }
}
