//! Agent runtime configuration.

use crate::domain_types::{DedupSetCapacity, IdleCycleThreshold, ReceiveTimeoutMs, ShutdownGraceSecs};

/// Validated configuration for an [`super::AgentRuntime`]'s event loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How long a single `receive` call blocks before the loop treats the
    /// cycle as idle.
    pub receive_timeout: ReceiveTimeoutMs,
    /// Consecutive idle cycles before `on_idle` fires.
    pub idle_threshold: IdleCycleThreshold,
    /// Capacity of the bounded LRU set used for at-most-once dispatch.
    pub dedup_capacity: DedupSetCapacity,
    /// Grace period honored on shutdown before the loop is torn down.
    pub shutdown_grace: ShutdownGraceSecs,
}

impl RuntimeConfig {
    /// Development defaults matching the design's stated defaults (5s
    /// receive timeout, 10-cycle idle threshold).
    #[must_use]
    pub fn development() -> Self {
        Self {
            receive_timeout: ReceiveTimeoutMs::default(),
            idle_threshold: IdleCycleThreshold::default(),
            dedup_capacity: DedupSetCapacity::default(),
            shutdown_grace: ShutdownGraceSecs::default(),
        }
    }

    /// Production defaults: identical to development unless a deployer has
    /// reason to diverge; kept distinct so callers have a stable name to
    /// depend on if that changes.
    #[must_use]
    pub fn production() -> Self {
        Self::development()
    }

    /// Testing defaults: short timeouts and a low idle threshold so tests
    /// exercise `on_idle` without waiting seconds.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            receive_timeout: ReceiveTimeoutMs::try_new(50).unwrap_or_default(),
            idle_threshold: IdleCycleThreshold::try_new(2).unwrap_or_default(),
            dedup_capacity: DedupSetCapacity::default(),
            shutdown_grace: ShutdownGraceSecs::try_new(0).unwrap_or_default(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::development()
    }
}
