//! Service bridge configuration.

use crate::domain_types::{BridgeMaxRetries, BridgeTimeoutMs};

/// Validated configuration for a [`super::ServiceBridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the Knowledge Store (`KNOWLEDGE_URL`, default port 8501).
    pub knowledge_url: String,
    /// Base URL of the Vector/Document Search service (`VECTOR_URL`,
    /// default port 8502).
    pub vector_url: String,
    /// Base URL of the Coordination Hub (`COORDINATION_URL`, default port
    /// 8503).
    pub coordination_url: String,
    /// Per-call timeout.
    pub timeout: BridgeTimeoutMs,
    /// Maximum retry attempts after the first.
    pub max_retries: BridgeMaxRetries,
}

impl BridgeConfig {
    /// Development defaults: the three reference services on localhost.
    #[must_use]
    pub fn development() -> Self {
        Self {
            knowledge_url: "http://127.0.0.1:8501".to_string(),
            vector_url: "http://127.0.0.1:8502".to_string(),
            coordination_url: "http://127.0.0.1:8503".to_string(),
            timeout: BridgeTimeoutMs::default(),
            max_retries: BridgeMaxRetries::default(),
        }
    }

    /// Production defaults: caller-provided service URLs, typically read
    /// from `KNOWLEDGE_URL`/`VECTOR_URL`/`COORDINATION_URL`.
    #[must_use]
    pub fn production(knowledge_url: impl Into<String>, vector_url: impl Into<String>, coordination_url: impl Into<String>) -> Self {
        Self {
            knowledge_url: knowledge_url.into(),
            vector_url: vector_url.into(),
            coordination_url: coordination_url.into(),
            timeout: BridgeTimeoutMs::default(),
            max_retries: BridgeMaxRetries::default(),
        }
    }

    /// Testing defaults: explicit URLs (typically pointed at an
    /// in-process test server) and a short timeout.
    #[must_use]
    pub fn testing(knowledge_url: impl Into<String>, vector_url: impl Into<String>, coordination_url: impl Into<String>) -> Self {
        Self {
            knowledge_url: knowledge_url.into(),
            vector_url: vector_url.into(),
            coordination_url: coordination_url.into(),
            timeout: BridgeTimeoutMs::try_new(500).unwrap_or_default(),
            max_retries: BridgeMaxRetries::try_new(1).unwrap_or_default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::development()
    }
}
