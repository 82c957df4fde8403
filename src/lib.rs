use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;
pub mod services;
pub mod tags;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};
pub use services::{PostService, ReactionService};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_posts, handlers::get_post, handlers::get_comments,
        handlers::get_categories, handlers::get_tags, handlers::get_me,
        handlers::create_comment, handlers::create_recomment, handlers::update_comment,
        handlers::delete_comment, handlers::create_like, handlers::delete_like,
        handlers::create_post, handlers::update_post, handlers::delete_post,
        handlers::create_category
    ),
    components(
        schemas(
            models::User, models::Grant, models::Category, models::Tag, models::Post,
            models::Comment, models::UserSummary, models::CategorySummary, models::PostView,
            models::CommentView, models::PostOrder, models::CreatePostRequest,
            models::UpdatePostRequest, models::CommentRequest, models::CreateCategoryRequest,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "blog-api", description = "Blog Content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container shared by every request. Workflows are built from it
/// on demand through `FromRef`, so handlers can ask for exactly what they use.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway (Postgres or in-memory).
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for PostService {
    fn from_ref(app_state: &AppState) -> PostService {
        PostService::new(app_state.repo.clone())
    }
}

impl FromRef<AppState> for ReactionService {
    fn from_ref(app_state: &AppState) -> ReactionService {
        ReactionService::new(app_state.repo.clone())
    }
}

/// auth_middleware
///
/// Route layer for `authenticated_routes`: extracting `AuthUser` rejects the request with
/// 401 before the handler runs when no identity can be resolved.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the public, authenticated and admin routers, the OpenAPI UI, and the
/// request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Grant checks happen in the post workflow, after `AuthUser` has resolved the caller.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // Request id is set first so the trace span and the response both carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request, tagged with method, uri and the `x-request-id` so every log
/// line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
