//! Vector/Document Search reference service: title/content weighted
//! matching over a separate document collection, served on port 8502.

use axum::Router;

use super::document_store::{self, WeightedMatcher};

/// Builds the Vector/Document Search router.
#[must_use]
pub fn router() -> Router {
    super::with_permissive_cors(document_store::router("vector", Box::new(WeightedMatcher)))
}
