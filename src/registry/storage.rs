//! Persistence for the task registry.
//!
//! Follows the functional-core/imperative-shell split used elsewhere in
//! this crate: `sql` holds pure statement-string constants, `mapping` holds
//! pure domain/row conversions, and `TaskStorage` is the thin imperative
//! shell that performs I/O against the connection pool.

use sqlx::{Row, sqlite::SqliteRow};

use crate::database::DatabaseConnection;
use crate::domain_types::{AgentId, Priority, TaskId};
use crate::error::RegistryError;
use crate::message::Artifact;
use crate::registry::domain::{Task, TaskHistoryEntry, TaskState, TaskType};

/// Pure SQL statement generators. No I/O; every function here returns a
/// `&'static str` and is trivially unit-testable.
mod sql {
    pub const UPSERT_TASK: &str = "INSERT INTO tasks \
        (task_id, task_type, state, priority, assigned_to, payload, created_at, updated_at, completed_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
        ON CONFLICT(task_id) DO UPDATE SET \
        task_type = excluded.task_type, \
        state = excluded.state, \
        priority = excluded.priority, \
        assigned_to = excluded.assigned_to, \
        payload = excluded.payload, \
        updated_at = excluded.updated_at, \
        completed_at = excluded.completed_at";

    pub const SELECT_TASK_BY_ID: &str = "SELECT task_id, task_type, state, priority, assigned_to, \
        payload, created_at, updated_at, completed_at FROM tasks WHERE task_id = ?";

    pub const SELECT_ALL_TASKS: &str = "SELECT task_id, task_type, state, priority, assigned_to, \
        payload, created_at, updated_at, completed_at FROM tasks";

    pub const SELECT_TASKS_BY_STATE: &str = "SELECT task_id, task_type, state, priority, assigned_to, \
        payload, created_at, updated_at, completed_at FROM tasks WHERE state = ?";

    pub const INSERT_HISTORY_ENTRY: &str =
        "INSERT INTO task_history (task_id, from_state, to_state, detail, recorded_at) \
        VALUES (?, ?, ?, ?, ?)";

    pub const SELECT_HISTORY_FOR_TASK: &str =
        "SELECT from_state, to_state, detail, recorded_at FROM task_history \
        WHERE task_id = ? ORDER BY id ASC";

    pub const INSERT_DEPENDENCY: &str =
        "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on) VALUES (?, ?)";

    pub const SELECT_DEPENDENCIES_FOR_TASK: &str =
        "SELECT depends_on FROM task_dependencies WHERE task_id = ?";

    pub const INSERT_ARTIFACT: &str =
        "INSERT INTO task_artifacts (task_id, label, uri) VALUES (?, ?, ?)";

    pub const SELECT_ARTIFACTS_FOR_TASK: &str =
        "SELECT label, uri FROM task_artifacts WHERE task_id = ?";

    pub const DELETE_ARTIFACTS_FOR_TASK: &str = "DELETE FROM task_artifacts WHERE task_id = ?";

    pub const DELETE_TERMINAL_TASKS_OLDER_THAN: &str =
        "DELETE FROM tasks WHERE completed_at IS NOT NULL AND completed_at < ?";
}

/// Pure domain <-> row conversions. No I/O.
mod mapping {
    use super::{AgentId, Priority, TaskState, TaskType};
    use chrono::{DateTime, Utc};

    pub fn task_type_to_str(t: TaskType) -> &'static str {
        match t {
            TaskType::Specification => "specification",
            TaskType::Build => "build",
            TaskType::Validate => "validate",
        }
    }

    pub fn parse_task_type(s: &str) -> Option<TaskType> {
        match s {
            "specification" => Some(TaskType::Specification),
            "build" => Some(TaskType::Build),
            "validate" => Some(TaskType::Validate),
            _ => None,
        }
    }

    pub fn task_state_to_str(s: TaskState) -> &'static str {
        match s {
            TaskState::Pending => "pending",
            TaskState::Assigned => "assigned",
            TaskState::Executing => "executing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        }
    }

    pub fn parse_task_state(s: &str) -> Option<TaskState> {
        match s {
            "pending" => Some(TaskState::Pending),
            "assigned" => Some(TaskState::Assigned),
            "executing" => Some(TaskState::Executing),
            "completed" => Some(TaskState::Completed),
            "failed" => Some(TaskState::Failed),
            "cancelled" => Some(TaskState::Cancelled),
            _ => None,
        }
    }

    pub fn priority_to_str(p: Priority) -> &'static str {
        match p {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse_priority(s: &str) -> Option<Priority> {
        match s {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn agent_id_to_string(id: AgentId) -> String {
        id.to_string()
    }

    pub fn parse_agent_id(s: &str) -> Option<AgentId> {
        s.parse().ok().map(AgentId::new)
    }

    pub fn timestamp_to_string(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339()
    }

    pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Imperative shell: the only part of this module that touches the
/// database connection.
pub struct TaskStorage {
    connection: DatabaseConnection,
}

impl TaskStorage {
    /// Wraps an initialized database connection.
    #[must_use]
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Persists a task's current row, its dependencies, and its artifacts.
    /// The caller is responsible for calling [`Self::append_history`]
    /// separately, since history is append-only and must not be
    /// overwritten by an upsert.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the write fails.
    pub async fn store_task(&self, task: &Task) -> Result<(), RegistryError> {
        sqlx::query(sql::UPSERT_TASK)
            .bind(task.id.to_string())
            .bind(mapping::task_type_to_str(task.task_type))
            .bind(mapping::task_state_to_str(task.state))
            .bind(mapping::priority_to_str(task.priority))
            .bind(task.assigned_to.map(mapping::agent_id_to_string))
            .bind(task.payload.to_string())
            .bind(mapping::timestamp_to_string(task.created_at))
            .bind(mapping::timestamp_to_string(task.updated_at))
            .bind(task.completed_at.map(mapping::timestamp_to_string))
            .execute(self.connection.pool())
            .await?;

        for dep in &task.dependencies {
            sqlx::query(sql::INSERT_DEPENDENCY)
                .bind(task.id.to_string())
                .bind(dep.to_string())
                .execute(self.connection.pool())
                .await?;
        }

        sqlx::query(sql::DELETE_ARTIFACTS_FOR_TASK)
            .bind(task.id.to_string())
            .execute(self.connection.pool())
            .await?;
        for artifact in &task.artifacts {
            sqlx::query(sql::INSERT_ARTIFACT)
                .bind(task.id.to_string())
                .bind(artifact.label.to_string())
                .bind(artifact.uri.to_string())
                .execute(self.connection.pool())
                .await?;
        }

        Ok(())
    }

    /// Appends one history entry. Never updates or deletes existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the write fails.
    pub async fn append_history(
        &self,
        task_id: TaskId,
        entry: &TaskHistoryEntry,
    ) -> Result<(), RegistryError> {
        sqlx::query(sql::INSERT_HISTORY_ENTRY)
            .bind(task_id.to_string())
            .bind(entry.from.map(mapping::task_state_to_str))
            .bind(mapping::task_state_to_str(entry.to))
            .bind(entry.detail.as_deref())
            .bind(mapping::timestamp_to_string(entry.recorded_at))
            .execute(self.connection.pool())
            .await?;
        Ok(())
    }

    /// Loads a task by id, including its history, dependencies, and
    /// artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TaskNotFound`] if no row matches, or
    /// [`RegistryError::Database`] on a lower-level failure.
    pub async fn get_task(&self, task_id: TaskId) -> Result<Task, RegistryError> {
        let row = sqlx::query(sql::SELECT_TASK_BY_ID)
            .bind(task_id.to_string())
            .fetch_optional(self.connection.pool())
            .await?
            .ok_or(RegistryError::TaskNotFound(task_id))?;

        self.hydrate(row).await
    }

    /// Loads every task currently in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the query fails.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, RegistryError> {
        let rows = sqlx::query(sql::SELECT_ALL_TASKS)
            .fetch_all(self.connection.pool())
            .await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(self.hydrate(row).await?);
        }
        Ok(tasks)
    }

    /// Loads every task currently in the given state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the query fails.
    pub async fn list_tasks_by_state(&self, state: TaskState) -> Result<Vec<Task>, RegistryError> {
        let rows = sqlx::query(sql::SELECT_TASKS_BY_STATE)
            .bind(mapping::task_state_to_str(state))
            .fetch_all(self.connection.pool())
            .await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(self.hydrate(row).await?);
        }
        Ok(tasks)
    }

    /// Deletes terminal-state tasks whose `completed_at` predates the
    /// retention cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the delete fails.
    pub async fn prune_terminal_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, RegistryError> {
        let result = sqlx::query(sql::DELETE_TERMINAL_TASKS_OLDER_THAN)
            .bind(mapping::timestamp_to_string(cutoff))
            .execute(self.connection.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn hydrate(&self, row: SqliteRow) -> Result<Task, RegistryError> {
        let task_id_str: String = row.try_get("task_id")?;
        let task_id = TaskId::new(task_id_str.parse().map_err(|_| {
            RegistryError::Database(sqlx::Error::Decode(
                "invalid task_id UUID in storage".into(),
            ))
        })?);

        let task_type_str: String = row.try_get("task_type")?;
        let task_type = mapping::parse_task_type(&task_type_str).ok_or_else(|| {
            RegistryError::Database(sqlx::Error::Decode("invalid task_type in storage".into()))
        })?;

        let state_str: String = row.try_get("state")?;
        let state = mapping::parse_task_state(&state_str).ok_or_else(|| {
            RegistryError::Database(sqlx::Error::Decode("invalid state in storage".into()))
        })?;

        let priority_str: String = row.try_get("priority")?;
        let priority = mapping::parse_priority(&priority_str).ok_or_else(|| {
            RegistryError::Database(sqlx::Error::Decode("invalid priority in storage".into()))
        })?;

        let assigned_to: Option<String> = row.try_get("assigned_to")?;
        let assigned_to = assigned_to.and_then(|s| mapping::parse_agent_id(&s));

        let payload_str: String = row.try_get("payload")?;
        let payload: serde_json::Value =
            serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null);

        let created_at_str: String = row.try_get("created_at")?;
        let created_at = mapping::parse_timestamp(&created_at_str).unwrap_or_else(chrono::Utc::now);

        let updated_at_str: String = row.try_get("updated_at")?;
        let updated_at = mapping::parse_timestamp(&updated_at_str).unwrap_or_else(chrono::Utc::now);

        let completed_at_str: Option<String> = row.try_get("completed_at")?;
        let completed_at = completed_at_str.and_then(|s| mapping::parse_timestamp(&s));

        let history = self.load_history(task_id).await?;
        let dependencies = self.load_dependencies(task_id).await?;
        let artifacts = self.load_artifacts(task_id).await?;

        Ok(Task {
            id: task_id,
            task_type,
            state,
            priority,
            assigned_to,
            dependencies,
            payload,
            artifacts,
            history,
            created_at,
            updated_at,
            completed_at,
        })
    }

    async fn load_history(&self, task_id: TaskId) -> Result<Vec<TaskHistoryEntry>, RegistryError> {
        let rows = sqlx::query(sql::SELECT_HISTORY_FOR_TASK)
            .bind(task_id.to_string())
            .fetch_all(self.connection.pool())
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let from_str: Option<String> = row.try_get("from_state")?;
            let to_str: String = row.try_get("to_state")?;
            let detail: Option<String> = row.try_get("detail")?;
            let recorded_at_str: String = row.try_get("recorded_at")?;

            entries.push(TaskHistoryEntry {
                from: from_str.and_then(|s| mapping::parse_task_state(&s)),
                to: mapping::parse_task_state(&to_str).unwrap_or(TaskState::Pending),
                detail,
                recorded_at: mapping::parse_timestamp(&recorded_at_str)
                    .unwrap_or_else(chrono::Utc::now),
            });
        }
        Ok(entries)
    }

    async fn load_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskId>, RegistryError> {
        let rows = sqlx::query(sql::SELECT_DEPENDENCIES_FOR_TASK)
            .bind(task_id.to_string())
            .fetch_all(self.connection.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let s: String = row.try_get("depends_on")?;
                s.parse()
                    .map(TaskId::new)
                    .map_err(|_| RegistryError::Database(sqlx::Error::Decode(
                        "invalid depends_on UUID in storage".into(),
                    )))
            })
            .collect()
    }

    async fn load_artifacts(&self, task_id: TaskId) -> Result<Vec<Artifact>, RegistryError> {
        let rows = sqlx::query(sql::SELECT_ARTIFACTS_FOR_TASK)
            .bind(task_id.to_string())
            .fetch_all(self.connection.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let label: String = row.try_get("label")?;
                let uri: String = row.try_get("uri")?;
                Ok(Artifact {
                    label: crate::domain_types::ArtifactLabel::try_new(label).map_err(|_| {
                        RegistryError::Database(sqlx::Error::Decode(
                            "invalid artifact label in storage".into(),
                        ))
                    })?,
                    uri: crate::domain_types::ArtifactUri::try_new(uri).map_err(|_| {
                        RegistryError::Database(sqlx::Error::Decode(
                            "invalid artifact uri in storage".into(),
                        ))
                    })?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_task_state_through_string() {
        for state in [
            TaskState::Pending,
            TaskState::Assigned,
            TaskState::Executing,
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Cancelled,
        ] {
            let s = mapping::task_state_to_str(state);
            assert_eq!(mapping::parse_task_state(s), Some(state));
        }
    }

    #[test]
    fn test_should_round_trip_priority_through_string() {
        for priority in [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ] {
            let s = mapping::priority_to_str(priority);
            assert_eq!(mapping::parse_priority(s), Some(priority));
        }
    }

    #[test]
    fn test_should_reject_unknown_task_state_string() {
        assert_eq!(mapping::parse_task_state("unknown"), None);
    }
}
