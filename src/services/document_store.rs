//! Shared implementation behind the Knowledge Store and Vector/Document
//! Search reference services: both expose the same four endpoints over an
//! in-memory, append-only item list, differing only in how a query is
//! scored against stored items.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use super::ErrorBody;
use crate::bridge::types::{KnowledgeItem, SearchRequest, SearchResponse, StoreKnowledgeRequest, StoreKnowledgeResponse};

/// How a stored item is scored against a query. Returns `None` for no
/// match, `Some(score)` otherwise; higher scores sort first.
pub trait Matcher: Send + Sync + 'static {
    /// Scores `item` against `query`, case-insensitively.
    fn score(&self, query: &str, item: &KnowledgeItem) -> Option<f64>;
}

/// Substring matcher used by the Knowledge Store: any hit in `content`,
/// `title`, or `tags` scores 1.0.
pub struct SubstringMatcher;

impl Matcher for SubstringMatcher {
    fn score(&self, query: &str, item: &KnowledgeItem) -> Option<f64> {
        let query = query.to_lowercase();
        let content_hit = item.content.to_lowercase().contains(&query);
        let metadata_hit = item
            .metadata
            .as_ref()
            .map(|metadata| metadata.to_string().to_lowercase().contains(&query))
            .unwrap_or(false);
        (content_hit || metadata_hit).then_some(1.0)
    }
}

/// Weighted title/content matcher used by the Vector/Document Search
/// service: a title hit scores 0.8, a content hit scores 0.5, and both
/// together sum (capped by the caller's sort, not normalized).
pub struct WeightedMatcher;

impl Matcher for WeightedMatcher {
    fn score(&self, query: &str, item: &KnowledgeItem) -> Option<f64> {
        let query = query.to_lowercase();
        let title_hit = item
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("title"))
            .and_then(|title| title.as_str())
            .is_some_and(|title| title.to_lowercase().contains(&query));
        let content_hit = item.content.to_lowercase().contains(&query);

        let mut score = 0.0;
        if title_hit {
            score += 0.8;
        }
        if content_hit {
            score += 0.5;
        }
        (score > 0.0).then_some(score)
    }
}

struct AppState {
    items: DashMap<String, KnowledgeItem>,
    matcher: Box<dyn Matcher>,
    service_name: &'static str,
}

/// Builds the four-endpoint router shared by both reference services.
#[must_use]
pub fn router(service_name: &'static str, matcher: Box<dyn Matcher>) -> Router {
    let state = Arc::new(AppState {
        items: DashMap::new(),
        matcher,
        service_name,
    });

    Router::new()
        .route("/store_knowledge", post(store))
        .route("/search_knowledge", post(search))
        .route("/list_knowledge", get(list))
        .route("/health", get(health))
        .with_state(state)
}

async fn store(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoreKnowledgeRequest>,
) -> Json<StoreKnowledgeResponse> {
    let id = Uuid::new_v4().to_string();
    state.items.insert(
        id.clone(),
        KnowledgeItem {
            id: id.clone(),
            content: request.content,
            metadata: request.metadata,
            created_at: Utc::now(),
        },
    );
    Json(StoreKnowledgeResponse { id })
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    if request.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("query must not be empty")),
        ));
    }

    let limit = request.limit.unwrap_or(10) as usize;
    let mut scored: Vec<(f64, KnowledgeItem)> = state
        .items
        .iter()
        .filter_map(|entry| {
            state
                .matcher
                .score(&request.query, entry.value())
                .map(|score| (score, entry.value().clone()))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    Ok(Json(SearchResponse {
        results: scored.into_iter().map(|(_, item)| item).collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

async fn list(State(state): State<Arc<AppState>>, Query(query): Query<ListQuery>) -> Json<Vec<KnowledgeItem>> {
    let mut items: Vec<KnowledgeItem> = state.items.iter().map(|entry| entry.value().clone()).collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = query.limit {
        items.truncate(limit as usize);
    }
    Json(items)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": state.service_name }))
}
