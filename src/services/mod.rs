//! Reference HTTP services: Knowledge Store, Vector/Document Search, and
//! Coordination Hub. Each is a small `axum` app with an in-memory store,
//! matching the wire contract the [`crate::bridge`] client calls against.

pub mod coordination;
pub mod document_store;
pub mod knowledge;
pub mod vector;

use axum::Router;
use tower_http::cors::CorsLayer;

/// Wraps `router` with the permissive CORS policy every reference service
/// applies.
pub fn with_permissive_cors(router: Router) -> Router {
    router.layer(CorsLayer::permissive())
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct ErrorBody {
    detail: String,
}

impl ErrorBody {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}
