//! Knowledge Store reference service: substring-matched shared knowledge
//! items, served on port 8501.

use axum::Router;

use super::document_store::{self, SubstringMatcher};

/// Builds the Knowledge Store router.
#[must_use]
pub fn router() -> Router {
    super::with_permissive_cors(document_store::router("knowledge", Box::new(SubstringMatcher)))
}
