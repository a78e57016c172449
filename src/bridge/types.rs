//! Wire types for the three reference services. These mirror the JSON
//! shapes the services accept and return; field names match the wire
//! contract exactly, not Rust naming conventions where the two diverge.

use serde::{Deserialize, Serialize};

/// `POST /store_knowledge` request body (Knowledge Store and
/// Vector/Document Search share this shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreKnowledgeRequest {
    /// The item's content.
    pub content: String,
    /// Optional free-form metadata, including an optional `title` field
    /// consulted by the Vector service's scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// `POST /store_knowledge` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreKnowledgeResponse {
    /// The newly assigned, stable item id.
    pub id: String,
}

/// `POST /search_knowledge` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The search query, matched by case-insensitive substring in the
    /// reference implementation.
    pub query: String,
    /// Maximum results to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Optional filters applied before scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
}

/// `POST /search_knowledge` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching items, highest-scoring first.
    pub results: Vec<KnowledgeItem>,
}

/// One stored knowledge/document item, as returned by list/search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Stable item id.
    pub id: String,
    /// Stored content.
    pub content: String,
    /// Stored metadata, if any was provided at creation.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// When the item was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// `POST /create_task` request body, for the Coordination Hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    /// Short task title.
    pub title: String,
    /// Longer task description.
    pub description: String,
    /// Agent the task is assigned to, if known at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Dispatch priority, as a lower-case string (`"low"`, `"medium"`,
    /// `"high"`, `"critical"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Task type/category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// `POST /create_task` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    /// The newly created Hub task id.
    pub task_id: String,
}

/// `PUT /tasks/{id}` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    /// New status string.
    pub status: String,
    /// Optional free-form progress data, appended to the task's note
    /// history rather than overwriting it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// One entry in a Hub task's append-only note history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNote {
    /// When the note was appended.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// The status at the time of this note.
    pub status: String,
    /// Free-form data attached to the note, if any.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A Coordination Hub task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Hub-assigned task id.
    pub task_id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Current status string.
    pub status: String,
    /// Assignee, if any.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Append-only status/progress history.
    #[serde(default)]
    pub notes: Vec<TaskNote>,
    /// When the record was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// `GET /tasks` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTasksResponse {
    /// Matching task records.
    pub tasks: Vec<TaskRecord>,
}

/// `GET /health` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status, e.g. `"healthy"`.
    pub status: String,
    /// Which service answered, if the service reports it.
    #[serde(default)]
    pub service: Option<String>,
}
