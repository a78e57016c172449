//! Coordination Hub reference service: an external task board agents can
//! project Registry tasks into, served on port 8503.
//!
//! `PUT /tasks/{id}` appends to an append-only `notes` history rather than
//! overwriting the record, so `GET /tasks` can report a task's full
//! progression to an external observer.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use super::ErrorBody;
use crate::bridge::types::{CreateTaskRequest, CreateTaskResponse, ListTasksResponse, TaskNote, TaskRecord, UpdateTaskRequest};

struct AppState {
    tasks: DashMap<String, TaskRecord>,
}

/// Builds the Coordination Hub router.
#[must_use]
pub fn router() -> Router {
    let state = Arc::new(AppState { tasks: DashMap::new() });

    let router = Router::new()
        .route("/create_task", post(create_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", put(update_task))
        .route("/complete_task", post(complete_task))
        .route("/health", get(health))
        .with_state(state);

    super::with_permissive_cors(router)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Json<CreateTaskResponse> {
    let task_id = Uuid::new_v4().to_string();
    let status = "pending".to_string();
    state.tasks.insert(
        task_id.clone(),
        TaskRecord {
            task_id: task_id.clone(),
            title: request.title,
            description: request.description,
            status: status.clone(),
            assigned_to: request.assigned_to,
            notes: vec![TaskNote {
                timestamp: Utc::now(),
                status,
                data: None,
            }],
            created_at: Utc::now(),
        },
    );
    Json(CreateTaskResponse { task_id })
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    assigned_to: Option<String>,
    limit: Option<u32>,
}

async fn list_tasks(State(state): State<Arc<AppState>>, Query(query): Query<ListQuery>) -> Json<ListTasksResponse> {
    let mut tasks: Vec<TaskRecord> = state
        .tasks
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|task| query.status.as_deref().is_none_or(|s| s == task.status))
        .filter(|task| {
            query
                .assigned_to
                .as_deref()
                .is_none_or(|a| task.assigned_to.as_deref() == Some(a))
        })
        .collect();

    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = query.limit {
        tasks.truncate(limit as usize);
    }
    Json(ListTasksResponse { tasks })
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRecord>, (StatusCode, Json<ErrorBody>)> {
    let mut entry = state
        .tasks
        .get_mut(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(ErrorBody::new(format!("no such task: {id}")))))?;

    entry.status = request.status.clone();
    entry.notes.push(TaskNote {
        timestamp: Utc::now(),
        status: request.status,
        data: request.data,
    });
    Ok(Json(entry.clone()))
}

#[derive(Debug, Deserialize)]
struct CompleteTaskRequest {
    task_id: String,
    result: Option<serde_json::Value>,
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteTaskRequest>,
) -> Result<Json<TaskRecord>, (StatusCode, Json<ErrorBody>)> {
    let mut entry = state.tasks.get_mut(&request.task_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(format!("no such task: {}", request.task_id))),
        )
    })?;

    entry.status = "completed".to_string();
    entry.notes.push(TaskNote {
        timestamp: Utc::now(),
        status: "completed".to_string(),
        data: request.result,
    });
    Ok(Json(entry.clone()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "coordination" }))
}
