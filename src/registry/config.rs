//! Task registry configuration.

use crate::domain_types::{ConnectionPoolSize, StuckTaskThresholdSecs, TaskRetentionDays};

/// Validated configuration for a [`super::TaskRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Path to the `SQLite` database file.
    pub database_path: std::path::PathBuf,
    /// Connection pool size.
    pub pool_size: ConnectionPoolSize,
    /// How long an `Executing` task may go without progress before
    /// `stuck_tasks` reports it.
    pub stuck_threshold: StuckTaskThresholdSecs,
    /// How long terminal-state tasks are retained before becoming eligible
    /// for pruning.
    pub retention: TaskRetentionDays,
}

impl RegistryConfig {
    /// Development defaults: a local file, generous stuck threshold.
    #[must_use]
    pub fn development() -> Self {
        Self {
            database_path: std::path::PathBuf::from("agor-registry.db"),
            pool_size: ConnectionPoolSize::default(),
            stuck_threshold: StuckTaskThresholdSecs::default(),
            retention: TaskRetentionDays::default(),
        }
    }

    /// Production defaults: larger pool, same thresholds as development
    /// unless overridden.
    #[must_use]
    pub fn production(database_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            pool_size: ConnectionPoolSize::try_new(25).unwrap_or_default(),
            stuck_threshold: StuckTaskThresholdSecs::default(),
            retention: TaskRetentionDays::default(),
        }
    }

    /// Testing defaults: a single connection, intended to be paired with a
    /// `tempfile` database path.
    #[must_use]
    pub fn testing(database_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            pool_size: ConnectionPoolSize::try_new(1).unwrap_or_default(),
            stuck_threshold: StuckTaskThresholdSecs::try_new(1).unwrap_or_default(),
            retention: TaskRetentionDays::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::development()
    }
}
