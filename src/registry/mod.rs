//! Task registry: durable task lifecycle tracking.
//!
//! `TaskRegistry` keeps an in-memory `DashMap` cache of every non-terminal
//! task (and recently-terminal ones, until pruned) for O(1) lookup, backed
//! by [`storage::TaskStorage`] for durability across restarts. Every
//! mutating operation persists before it returns, so a crash between the
//! in-memory update and the durable write is never observable to a caller
//! who only sees a successful return.

pub mod config;
pub mod domain;
pub mod storage;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, instrument, warn};

use crate::domain_types::{AgentId, Priority, TaskId};
use crate::error::RegistryError;
use crate::message::Artifact;

pub use config::RegistryConfig;
pub use domain::{Task, TaskHistoryEntry, TaskState, TaskType};
pub use storage::TaskStorage;

/// Durable, concurrency-safe task lifecycle registry.
pub struct TaskRegistry {
    tasks: Arc<DashMap<TaskId, Task>>,
    storage: TaskStorage,
    config: RegistryConfig,
}

impl TaskRegistry {
    /// Opens (or creates) the registry's database and loads every
    /// non-terminal task into the in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::database::DatabaseError`] wrapped as
    /// [`RegistryError::Database`] if the database cannot be opened, or a
    /// lower-level database error if the initial load fails.
    #[instrument(skip(config), fields(db = %config.database_path.display()))]
    pub async fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        let db_path = crate::database::DatabasePath::new(&config.database_path)
            .map_err(|e| RegistryError::Database(sqlx::Error::Configuration(e.to_string().into())))?;
        let db_config = crate::database::DatabaseConfig::new(db_path)
            .with_pool_size(config.pool_size);
        let connection = crate::database::DatabaseConnection::initialize(db_config)
            .await
            .map_err(|e| RegistryError::Database(sqlx::Error::Configuration(e.to_string().into())))?;

        let storage = TaskStorage::new(connection);
        let tasks = DashMap::new();

        for state in [
            TaskState::Pending,
            TaskState::Assigned,
            TaskState::Executing,
        ] {
            for task in storage.list_tasks_by_state(state).await? {
                tasks.insert(task.id, task);
            }
        }

        info!(restored = tasks.len(), "task registry restored non-terminal tasks from storage");

        Ok(Self {
            tasks: Arc::new(tasks),
            storage,
            config,
        })
    }

    /// Wraps an already-initialized storage layer without touching disk,
    /// for tests that construct their own temp database.
    #[must_use]
    pub fn with_storage(storage: TaskStorage, config: RegistryConfig) -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            storage,
            config,
        }
    }

    /// Creates and persists a new `Pending` task.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DependencyCycle`] if `dependencies`
    /// contains the would-be task's own id (impossible by construction, but
    /// checked defensively) or [`RegistryError::Database`] if persistence
    /// fails.
    #[instrument(skip(self, payload))]
    pub async fn create(
        &self,
        task_type: TaskType,
        priority: Priority,
        payload: serde_json::Value,
        dependencies: Vec<TaskId>,
    ) -> Result<Task, RegistryError> {
        let task = Task::new(task_type, priority, payload, dependencies);
        self.storage.store_task(&task).await?;
        self.storage
            .append_history(task.id, &task.history[0])
            .await?;
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// Assigns a `Pending` task to an agent, provided every dependency has
    /// reached `Completed`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`], [`RegistryError::UnmetDependencies`],
    /// or [`RegistryError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn assign(&self, task_id: TaskId, agent_id: AgentId) -> Result<Task, RegistryError> {
        let unmet: Vec<TaskId> = {
            let task = self
                .tasks
                .get(&task_id)
                .ok_or(RegistryError::TaskNotFound(task_id))?;
            task.dependencies
                .iter()
                .copied()
                .filter(|dep| {
                    !self
                        .tasks
                        .get(dep)
                        .is_some_and(|d| d.state == TaskState::Completed)
                })
                .collect()
        };
        if !unmet.is_empty() {
            return Err(RegistryError::UnmetDependencies { task_id, unmet });
        }

        self.transition(task_id, TaskState::Assigned, None, |task| {
            task.assigned_to = Some(agent_id);
        })
        .await
    }

    /// Marks an `Assigned` task as `Executing`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] or [`RegistryError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn mark_executing(&self, task_id: TaskId) -> Result<Task, RegistryError> {
        self.transition(task_id, TaskState::Executing, None, |_| {}).await
    }

    /// Marks a task `Completed`, attaching any produced artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] or [`RegistryError::InvalidTransition`].
    #[instrument(skip(self, artifacts))]
    pub async fn complete(
        &self,
        task_id: TaskId,
        artifacts: Vec<Artifact>,
    ) -> Result<Task, RegistryError> {
        self.transition(task_id, TaskState::Completed, None, |task| {
            task.artifacts.extend(artifacts);
        })
        .await
    }

    /// Marks a task `Failed`, recording the reason in its history.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] or [`RegistryError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn fail(&self, task_id: TaskId, reason: impl Into<String>) -> Result<Task, RegistryError> {
        self.transition(task_id, TaskState::Failed, Some(reason.into()), |_| {})
            .await
    }

    /// Cancels a task that has not yet reached a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] or [`RegistryError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn cancel(&self, task_id: TaskId, reason: impl Into<String>) -> Result<Task, RegistryError> {
        self.transition(task_id, TaskState::Cancelled, Some(reason.into()), |_| {})
            .await
    }

    /// Looks up a task by id, consulting the in-memory cache first and
    /// falling back to storage (for terminal tasks evicted from the
    /// cache).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] if no such task exists.
    pub async fn get(&self, task_id: TaskId) -> Result<Task, RegistryError> {
        if let Some(task) = self.tasks.get(&task_id) {
            return Ok(task.clone());
        }
        self.storage.get_task(task_id).await
    }

    /// Lists every task currently held in the in-memory cache (i.e. every
    /// non-terminal task, plus any terminal task not yet pruned from
    /// memory).
    #[must_use]
    pub fn list(&self) -> Vec<Task> {
        self.tasks.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns `Assigned` or `Executing` tasks that have not transitioned
    /// since longer than the registry's configured stuck threshold.
    #[must_use]
    pub fn stuck_tasks(&self) -> Vec<Task> {
        let threshold = self.config.stuck_threshold.as_duration();
        let now = chrono::Utc::now();
        self.tasks
            .iter()
            .filter(|entry| matches!(entry.value().state, TaskState::Assigned | TaskState::Executing))
            .filter(|entry| {
                let elapsed = now.signed_duration_since(entry.value().updated_at);
                elapsed
                    .to_std()
                    .map(|d| d >= threshold)
                    .unwrap_or(false)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns `Pending` tasks whose dependencies have all completed,
    /// ordered by priority then by creation time (FIFO within a priority
    /// tier).
    #[must_use]
    pub fn tasks_ready(&self) -> Vec<Task> {
        let mut ready: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.value().state == TaskState::Pending)
            .filter(|entry| {
                entry.value().dependencies.iter().all(|dep| {
                    self.tasks
                        .get(dep)
                        .is_some_and(|d| d.state == TaskState::Completed)
                })
            })
            .map(|entry| entry.value().clone())
            .collect();

        ready.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        ready
    }

    /// Deletes terminal tasks older than the registry's configured
    /// retention window, both from storage and from the in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the delete fails.
    pub async fn prune_expired(&self) -> Result<u64, RegistryError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::days(i64::from(self.config.retention.as_u32()));
        let pruned = self.storage.prune_terminal_before(cutoff).await?;
        self.tasks.retain(|_, task| {
            !task
                .completed_at
                .is_some_and(|completed| completed < cutoff)
        });
        Ok(pruned)
    }

    async fn transition(
        &self,
        task_id: TaskId,
        to: TaskState,
        detail: Option<String>,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Task, RegistryError> {
        let mut task = self
            .tasks
            .get(&task_id)
            .map(|entry| entry.value().clone())
            .ok_or(RegistryError::TaskNotFound(task_id))?;

        task.transition_to(to, detail)?;
        mutate(&mut task);

        self.storage.store_task(&task).await?;
        self.storage
            .append_history(task_id, task.history.last().expect("just pushed"))
            .await?;

        if to.is_terminal() {
            warn!(%task_id, state = %to, "task reached terminal state");
        }

        self.tasks.insert(task_id, task.clone());
        Ok(task)
    }
}
