//! Orchestrator-local agent registry: tracks which agents are known, what
//! role each advertises, and whether each is currently available for
//! dispatch.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain_types::AgentId;

/// An agent's current availability for new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Ready to accept a new assignment.
    Available,
    /// Currently executing an assigned task.
    Busy,
    /// Registered but not currently accepting work (e.g. awaiting a
    /// dependency it cannot act on yet).
    Blocked,
    /// Has not sent a heartbeat within the offline window.
    Offline,
}

/// Everything the orchestrator knows about one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// The agent's identifier.
    pub id: AgentId,
    /// The role it advertised when registering (e.g. `"architect"`,
    /// `"builder"`, `"validator"`).
    pub role: String,
    /// Capability tags the agent advertises. Not consulted by role-based
    /// routing; retained for a future capability-routing extension.
    pub capabilities: Vec<String>,
    /// Current availability.
    pub status: AgentStatus,
    /// When the agent last sent an `AgentOnline`/heartbeat message.
    pub last_seen: DateTime<Utc>,
}

/// Role-keyed, least-recently-assigned agent registry.
pub struct AgentRegistry {
    agents: DashMap<AgentId, AgentDescriptor>,
    offline_after: chrono::Duration,
}

impl AgentRegistry {
    /// Creates an empty registry. Agents not heard from within
    /// `offline_after` are reported as `Offline` by [`Self::refresh_liveness`].
    #[must_use]
    pub fn new(offline_after: chrono::Duration) -> Self {
        Self {
            agents: DashMap::new(),
            offline_after,
        }
    }

    /// Registers or re-registers an agent as `Available`.
    pub fn register(&self, id: AgentId, role: impl Into<String>, capabilities: Vec<String>) {
        self.agents.insert(
            id,
            AgentDescriptor {
                id,
                role: role.into(),
                capabilities,
                status: AgentStatus::Available,
                last_seen: Utc::now(),
            },
        );
    }

    /// Records a heartbeat, refreshing `last_seen` and clearing `Offline`
    /// if the agent had lapsed.
    pub fn heartbeat(&self, id: AgentId) {
        if let Some(mut entry) = self.agents.get_mut(&id) {
            entry.last_seen = Utc::now();
            if entry.status == AgentStatus::Offline {
                entry.status = AgentStatus::Available;
            }
        }
    }

    /// Sets an agent's status directly (e.g. `Busy` on assignment,
    /// `Available` on task completion).
    pub fn set_status(&self, id: AgentId, status: AgentStatus) {
        if let Some(mut entry) = self.agents.get_mut(&id) {
            entry.status = status;
        }
    }

    /// Marks any agent whose `last_seen` predates the offline window as
    /// `Offline`. Call periodically from the orchestrator's idle loop.
    pub fn refresh_liveness(&self) {
        let cutoff = Utc::now() - self.offline_after;
        for mut entry in self.agents.iter_mut() {
            if entry.last_seen < cutoff && entry.status != AgentStatus::Offline {
                entry.status = AgentStatus::Offline;
            }
        }
    }

    /// Picks the least-recently-assigned `Available` agent for `role`, if
    /// any. "Least-recently-assigned" here is approximated by oldest
    /// `last_seen` among equally-available candidates, consistent with the
    /// original admin agent's round-robin-by-recency selection.
    #[must_use]
    pub fn select_for_role(&self, role: &str) -> Option<AgentId> {
        self.agents
            .iter()
            .filter(|entry| entry.role == role && entry.status == AgentStatus::Available)
            .min_by_key(|entry| entry.last_seen)
            .map(|entry| entry.id)
    }

    /// Looks up an agent's descriptor.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<AgentDescriptor> {
        self.agents.get(&id).map(|entry| entry.clone())
    }

    /// Lists every known agent.
    #[must_use]
    pub fn list(&self) -> Vec<AgentDescriptor> {
        self.agents.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_select_least_recently_seen_available_agent() {
        let registry = AgentRegistry::new(chrono::Duration::minutes(5));
        let a = AgentId::generate();
        let b = AgentId::generate();
        registry.register(a, "builder", vec![]);
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.register(b, "builder", vec![]);

        assert_eq!(registry.select_for_role("builder"), Some(a));
    }

    #[test]
    fn test_should_skip_busy_agents_when_selecting() {
        let registry = AgentRegistry::new(chrono::Duration::minutes(5));
        let a = AgentId::generate();
        registry.register(a, "builder", vec![]);
        registry.set_status(a, AgentStatus::Busy);

        assert_eq!(registry.select_for_role("builder"), None);
    }

    #[test]
    fn test_should_mark_stale_agent_offline() {
        let registry = AgentRegistry::new(chrono::Duration::zero());
        let a = AgentId::generate();
        registry.register(a, "builder", vec![]);
        registry.refresh_liveness();

        assert_eq!(registry.get(a).unwrap().status, AgentStatus::Offline);
    }

    #[test]
    fn test_should_clear_offline_on_heartbeat() {
        let registry = AgentRegistry::new(chrono::Duration::zero());
        let a = AgentId::generate();
        registry.register(a, "builder", vec![]);
        registry.refresh_liveness();
        assert_eq!(registry.get(a).unwrap().status, AgentStatus::Offline);

        registry.heartbeat(a);
        assert_eq!(registry.get(a).unwrap().status, AgentStatus::Available);
    }
}
