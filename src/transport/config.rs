//! Message transport configuration.

use crate::domain_types::TransportStatusCacheTtlMs;

/// Validated configuration for a [`super::Transport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Directory holding the fallback log (`messages.log`) and per-agent
    /// cursor files.
    pub shared_dir: std::path::PathBuf,
    /// How long a broker-reachability check result may be reused before
    /// it is re-checked.
    pub status_cache_ttl: TransportStatusCacheTtlMs,
}

impl TransportConfig {
    /// Development defaults: a local `./shared` directory.
    #[must_use]
    pub fn development() -> Self {
        Self {
            shared_dir: std::path::PathBuf::from("./shared"),
            status_cache_ttl: TransportStatusCacheTtlMs::default(),
        }
    }

    /// Production defaults: caller-provided shared directory (typically
    /// from the `SHARED_DIR` environment variable).
    #[must_use]
    pub fn production(shared_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            shared_dir: shared_dir.into(),
            status_cache_ttl: TransportStatusCacheTtlMs::default(),
        }
    }

    /// Testing defaults: intended to be paired with a `tempfile` directory
    /// and a zero-length cache TTL so tests observe broker state changes
    /// immediately.
    #[must_use]
    pub fn testing(shared_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            shared_dir: shared_dir.into(),
            status_cache_ttl: TransportStatusCacheTtlMs::try_new(0).unwrap_or_default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::development()
    }
}
