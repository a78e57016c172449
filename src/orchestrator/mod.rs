//! Orchestrator: role-based task routing and pipeline advancement.
//!
//! Submits new work to the least-recently-assigned available agent of the
//! right role, and advances the specification -> build -> validate
//! pipeline as agents report progress via `INFORM` messages.

pub mod agent_registry;
pub mod config;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

pub use agent_registry::{AgentDescriptor, AgentRegistry, AgentStatus};
pub use config::OrchestratorConfig;

use crate::domain_types::{AgentId, Priority, TaskId};
use crate::error::OrchestratorError;
use crate::message::{Artifact, Intent, Message, PayloadKind};
use crate::registry::{TaskRegistry, TaskState, TaskType};
use crate::transport::Transport;

/// Maps a task type to the agent role that performs it.
#[must_use]
pub fn role_for_task_type(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::Specification => "architect",
        TaskType::Build => "builder",
        TaskType::Validate => "validator",
    }
}

/// Orchestrator-local scratch state, grounded in the original admin
/// agent's `SharedContext`: small cross-task bookkeeping that is not part
/// of the task registry's authoritative state.
pub struct SharedContext {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl SharedContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Reads a value by key.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().await.get(key).cloned()
    }

    /// Writes a value by key, overwriting any previous value.
    pub async fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.values.write().await.insert(key.into(), value);
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates task submission, agent registration, and pipeline
/// advancement across the architect/builder/validator roles.
pub struct Orchestrator {
    id: AgentId,
    transport: Arc<Transport>,
    tasks: Arc<TaskRegistry>,
    agents: AgentRegistry,
    context: SharedContext,
}

impl Orchestrator {
    /// Builds an orchestrator identified by `id`, over the given task
    /// registry and transport.
    #[must_use]
    pub fn new(id: AgentId, transport: Arc<Transport>, tasks: Arc<TaskRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            id,
            transport,
            tasks,
            agents: AgentRegistry::new(config.offline_after),
            context: SharedContext::new(),
        }
    }

    /// The orchestrator's own agent id, used as `sender` on outbound
    /// messages.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Read-only access to the orchestrator-local scratch context.
    #[must_use]
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Creates a task and attempts immediate dispatch to an available
    /// agent of the matching role. If no agent is available the task is
    /// left `Pending` for a later [`Self::dispatch_ready_tasks`] pass.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Registry`] if task creation fails, or
    /// [`OrchestratorError::Transport`] if a dispatch send fails outright.
    #[instrument(skip(self, payload))]
    pub async fn submit_task(
        &self,
        task_type: TaskType,
        priority: Priority,
        payload: serde_json::Value,
        dependencies: Vec<TaskId>,
    ) -> Result<TaskId, OrchestratorError> {
        let task = self
            .tasks
            .create(task_type, priority, payload, dependencies)
            .await?;

        if self.dependencies_met(&task.dependencies).await {
            self.try_dispatch(task.id, task_type).await?;
        }

        Ok(task.id)
    }

    async fn dependencies_met(&self, dependencies: &[TaskId]) -> bool {
        for dep in dependencies {
            match self.tasks.get(*dep).await {
                Ok(task) if task.state == TaskState::Completed => {}
                _ => return false,
            }
        }
        true
    }

    async fn try_dispatch(&self, task_id: TaskId, task_type: TaskType) -> Result<bool, OrchestratorError> {
        let role = role_for_task_type(task_type);
        let Some(agent_id) = self.agents.select_for_role(role) else {
            return Ok(false);
        };

        self.tasks.assign(task_id, agent_id).await?;
        self.agents.set_status(agent_id, AgentStatus::Busy);

        // The assignee starts work as soon as the REQUEST is sent (no
        // separate "started" signal exists in this protocol), so dispatch
        // is the point at which the task actually begins executing.
        self.tasks.mark_executing(task_id).await?;

        let request = self.build_request(task_id, task_type).await?;
        self.transport
            .send(Message::new(Intent::Request, self.id, agent_id, request))
            .await?;

        info!(%task_id, %agent_id, role, "dispatched task to agent");
        Ok(true)
    }

    async fn build_request(
        &self,
        task_id: TaskId,
        task_type: TaskType,
    ) -> Result<PayloadKind, OrchestratorError> {
        let task = self.tasks.get(task_id).await?;
        Ok(match task_type {
            TaskType::Specification => PayloadKind::CreateSpecification {
                task_id,
                extra: HashMap::new(),
            },
            TaskType::Build => PayloadKind::BuildFromSpec {
                task_id,
                artifacts: task.artifacts,
                extra: HashMap::new(),
            },
            TaskType::Validate => PayloadKind::ValidateBuild {
                task_id,
                artifacts: task.artifacts,
                extra: HashMap::new(),
            },
        })
    }

    /// Attempts to dispatch every currently-ready pending task, in
    /// priority-then-FIFO order. Intended to be called from an idle loop
    /// so tasks queued while no agent was available get picked up once
    /// one becomes free.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrchestratorError`] encountered; callers
    /// running this periodically should log and continue rather than
    /// treat it as fatal.
    pub async fn dispatch_ready_tasks(&self) -> Result<usize, OrchestratorError> {
        self.agents.refresh_liveness();
        let mut dispatched = 0;
        for task in self.tasks.tasks_ready() {
            if self.try_dispatch(task.id, task.task_type).await? {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Handles an inbound `INFORM` message: agent registration, heartbeats,
    /// and pipeline advancement.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the registry update the inform
    /// triggers fails.
    #[instrument(skip(self, message))]
    pub async fn handle_inform(&self, message: &Message) -> Result<(), OrchestratorError> {
        match &message.payload {
            PayloadKind::AgentOnline { role, .. } => {
                self.agents.register(message.sender, role.clone(), vec![]);
                info!(agent_id = %message.sender, role, "agent registered");
            }
            PayloadKind::SpecificationReady { task_id, artifacts, .. } => {
                self.advance_pipeline(*task_id, artifacts.clone(), TaskType::Build)
                    .await?;
            }
            PayloadKind::BuildComplete { task_id, artifacts, .. } => {
                self.advance_pipeline(*task_id, artifacts.clone(), TaskType::Validate)
                    .await?;
            }
            PayloadKind::ValidationComplete {
                task_id,
                passed,
                artifacts,
                ..
            } => {
                if *passed {
                    self.tasks.complete(*task_id, artifacts.clone()).await?;
                } else {
                    self.tasks.fail(*task_id, "validation reported failure").await?;
                }
                self.release_assignee(*task_id).await;
            }
            other => {
                warn!(?other, "orchestrator received an INFORM it does not interpret");
            }
        }
        Ok(())
    }

    async fn advance_pipeline(
        &self,
        completed_task_id: TaskId,
        artifacts: Vec<Artifact>,
        next: TaskType,
    ) -> Result<(), OrchestratorError> {
        self.tasks.complete(completed_task_id, artifacts).await?;
        self.release_assignee(completed_task_id).await;

        let next_task_id = self
            .submit_task(
                next,
                Priority::Medium,
                serde_json::json!({ "predecessor": completed_task_id }),
                vec![completed_task_id],
            )
            .await?;
        info!(%completed_task_id, %next_task_id, ?next, "advanced pipeline to next stage");
        Ok(())
    }

    async fn release_assignee(&self, task_id: TaskId) {
        if let Ok(task) = self.tasks.get(task_id).await {
            if let Some(agent_id) = task.assigned_to {
                self.agents.set_status(agent_id, AgentStatus::Available);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn orchestrator() -> (Orchestrator, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("orchestrator.db");
        let registry_config = crate::registry::RegistryConfig::testing(db_path);
        let tasks = Arc::new(TaskRegistry::open(registry_config).await.unwrap());

        let transport_dir = dir.path().join("shared");
        let transport_config = crate::transport::TransportConfig::testing(transport_dir);
        let transport = Arc::new(Transport::new(&transport_config));

        let orchestrator = Orchestrator::new(
            AgentId::generate(),
            transport,
            tasks,
            OrchestratorConfig::testing(),
        );
        (orchestrator, dir)
    }

    #[tokio::test]
    async fn test_should_leave_task_pending_when_no_agent_available() {
        let (orchestrator, _dir) = orchestrator().await;
        let task_id = orchestrator
            .submit_task(TaskType::Build, Priority::Medium, serde_json::json!({}), vec![])
            .await
            .unwrap();

        let task = orchestrator.tasks.get(task_id).await.unwrap();
        assert_eq!(task.state, TaskState::Pending);
    }

    #[tokio::test]
    async fn test_should_dispatch_immediately_when_agent_available() {
        let (orchestrator, _dir) = orchestrator().await;
        let builder = AgentId::generate();
        orchestrator.agents.register(builder, "builder", vec![]);
        let mut channel = orchestrator.transport.register(builder);

        let task_id = orchestrator
            .submit_task(TaskType::Build, Priority::Medium, serde_json::json!({}), vec![])
            .await
            .unwrap();

        let task = orchestrator.tasks.get(task_id).await.unwrap();
        assert_eq!(task.state, TaskState::Executing);
        assert_eq!(task.assigned_to, Some(builder));

        let received = orchestrator
            .transport
            .receive(&mut channel, builder, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn test_should_advance_pipeline_on_specification_ready() {
        let (orchestrator, _dir) = orchestrator().await;
        let architect = AgentId::generate();
        orchestrator.agents.register(architect, "architect", vec![]);

        let spec_task = orchestrator
            .submit_task(
                TaskType::Specification,
                Priority::Medium,
                serde_json::json!({}),
                vec![],
            )
            .await
            .unwrap();

        let inform = Message::new(
            Intent::Inform,
            architect,
            orchestrator.id(),
            PayloadKind::SpecificationReady {
                task_id: spec_task,
                artifacts: vec![],
                extra: HashMap::new(),
            },
        );
        orchestrator.handle_inform(&inform).await.unwrap();

        let spec = orchestrator.tasks.get(spec_task).await.unwrap();
        assert_eq!(spec.state, TaskState::Completed);

        let all_tasks = orchestrator.tasks.list();
        assert!(all_tasks.iter().any(|t| t.task_type == TaskType::Build));
    }
}
