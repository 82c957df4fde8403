use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Content management, nested under `/admin`. Handlers take `AuthUser` (401 without an
/// identity) and the post workflow rejects any actor whose grant is not ADMIN (403).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/posts
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /admin/posts/{id}
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /admin/categories
        .route("/categories", post(handlers::create_category))
}
