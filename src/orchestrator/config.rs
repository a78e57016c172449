//! Orchestrator configuration.

/// Validated configuration for an [`super::Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long an agent may go without a heartbeat before it is reported
    /// `Offline`.
    pub offline_after: chrono::Duration,
}

impl OrchestratorConfig {
    /// Development defaults: a generous 5-minute offline window.
    #[must_use]
    pub fn development() -> Self {
        Self {
            offline_after: chrono::Duration::minutes(5),
        }
    }

    /// Production defaults: identical to development; deployers with
    /// stricter liveness requirements can override directly.
    #[must_use]
    pub fn production() -> Self {
        Self::development()
    }

    /// Testing defaults: a short window so liveness tests run fast.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            offline_after: chrono::Duration::milliseconds(50),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::development()
    }
}
