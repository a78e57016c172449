//! Task state machine: the pure, validated core of the task registry.
//!
//! Mirrors the validated-transition pattern used for agent lifecycles
//! elsewhere in this crate family: states declare which transitions are
//! legal, and every transition is checked before it is applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_types::{AgentId, Priority, TaskId};
use crate::error::RegistryError;
use crate::message::Artifact;

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Produce a specification for a body of work.
    Specification,
    /// Build an implementation from a specification.
    Build,
    /// Validate a build.
    Validate,
}

/// A task's position in its lifecycle.
///
/// ```text
/// Pending -> Assigned -> Executing -> Completed
///    \           \           \-----> Failed
///     \           \-------------\--> Cancelled
///      \------------------------\--> Failed (via fail(), any non-terminal state)
/// ```
///
/// `Completed`, `Failed`, and `Cancelled` are terminal: no further
/// transition is valid once a task reaches one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, not yet assigned to an agent.
    Pending,
    /// Assigned to an agent, not yet started.
    Assigned,
    /// The assignee has begun work.
    Executing,
    /// Work finished successfully.
    Completed,
    /// Work finished unsuccessfully.
    Failed,
    /// Work was cancelled before completion.
    Cancelled,
}

impl TaskState {
    /// Whether this state has no further valid transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The states reachable directly from this one.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Assigned, Self::Failed, Self::Cancelled],
            Self::Assigned => &[Self::Executing, Self::Failed, Self::Cancelled],
            Self::Executing => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Whether `self -> to` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One recorded transition, kept forever in the task's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    /// The state the task was in before this entry, or `None` for the
    /// initial `Pending` record.
    pub from: Option<TaskState>,
    /// The state the task moved into.
    pub to: TaskState,
    /// Free-form detail attached to the transition (e.g. a failure reason).
    pub detail: Option<String>,
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A unit of work tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// What kind of work this is.
    pub task_type: TaskType,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Dispatch priority used when no agent is immediately available.
    pub priority: Priority,
    /// The agent currently assigned, if any.
    pub assigned_to: Option<AgentId>,
    /// Other tasks that must reach `Completed` before this one may be
    /// assigned.
    pub dependencies: Vec<TaskId>,
    /// Role-specific task content, opaque to the registry.
    pub payload: serde_json::Value,
    /// Artifacts attached as the task progresses.
    pub artifacts: Vec<Artifact>,
    /// Append-only transition log.
    pub history: Vec<TaskHistoryEntry>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the task reached a terminal state, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new `Pending` task with no assignee and an empty history
    /// apart from its creation record.
    #[must_use]
    pub fn new(
        task_type: TaskType,
        priority: Priority,
        payload: serde_json::Value,
        dependencies: Vec<TaskId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            task_type,
            state: TaskState::Pending,
            priority,
            assigned_to: None,
            dependencies,
            payload,
            artifacts: Vec::new(),
            history: vec![TaskHistoryEntry {
                from: None,
                to: TaskState::Pending,
                detail: None,
                recorded_at: now,
            }],
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Validates and applies a state transition, appending a history entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTransition`] if `to` is not reachable
    /// from the task's current state.
    pub fn transition_to(&mut self, to: TaskState, detail: Option<String>) -> Result<(), RegistryError> {
        if !self.state.can_transition_to(to) {
            return Err(RegistryError::InvalidTransition {
                task_id: self.id,
                from: self.state,
                to,
            });
        }

        let now = Utc::now();
        self.history.push(TaskHistoryEntry {
            from: Some(self.state),
            to,
            detail,
            recorded_at: now,
        });
        self.state = to;
        self.updated_at = now;
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Whether every dependency has reached `Completed`.
    #[must_use]
    pub fn dependencies_satisfied(&self, completed: &dyn Fn(TaskId) -> bool) -> bool {
        self.dependencies.iter().all(|dep| completed(*dep))
    }
}
