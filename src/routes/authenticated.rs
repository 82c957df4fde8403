use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user. The router is wrapped in the auth middleware, and every
/// handler also takes `AuthUser`, so the caller's id is always the one the token names.
/// Comment ownership is checked by the reaction workflow, not here.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // POST /posts/{id}/comments
        .route("/posts/{id}/comments", post(handlers::create_comment))
        // POST /posts/{id}/comments/{comment_id}/replies
        // One level of replies only.
        .route(
            "/posts/{id}/comments/{comment_id}/replies",
            post(handlers::create_recomment),
        )
        // PUT/DELETE /comments/{id}
        // Owner-only, even for ADMIN users.
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // POST/DELETE /posts/{id}/likes
        .route(
            "/posts/{id}/likes",
            post(handlers::create_like).delete(handlers::delete_like),
        )
}
