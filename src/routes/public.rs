use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints open to anonymous clients. No extractor here requires an identity.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /posts?order=asc|desc
        .route("/posts", get(handlers::get_posts))
        // GET /posts/{id}?order=asc|desc
        .route("/posts/{id}", get(handlers::get_post))
        // GET /posts/{id}/comments
        // Answers 404 when the post exists but has no comments yet.
        .route("/posts/{id}/comments", get(handlers::get_comments))
        .route("/categories", get(handlers::get_categories))
        .route("/tags", get(handlers::get_tags))
}
