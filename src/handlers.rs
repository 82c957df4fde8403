use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorResponse},
    models::{
        Category, Comment, CommentInput, CommentRequest, CommentView, CreateCategoryRequest,
        CreatePostRequest, PostOrder, PostView, Tag, UpdatePostRequest, User,
    },
    repository::RepositoryState,
    services::{PostService, ReactionService},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// PostQuery
///
/// Query parameters accepted by the post read endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PostQuery {
    /// Sort on creation time, `asc` or `desc` (default).
    pub order: Option<PostOrder>,
}

// --- Public Handlers ---

/// get_posts
///
/// [Public Route] Lists every post with author, category and tags.
/// An empty blog answers 404.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "All posts", body = [PostView]),
        (status = 404, description = "No posts yet", body = ErrorResponse)
    )
)]
pub async fn get_posts(
    State(posts): State<PostService>,
    Query(query): Query<PostQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let views = posts.get_posts(query.order.unwrap_or_default()).await?;
    Ok(Json(views))
}

/// get_post
///
/// [Public Route] A single hydrated post.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID"), PostQuery),
    responses(
        (status = 200, description = "Found", body = PostView),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_post(
    State(posts): State<PostService>,
    Path(id): Path<Uuid>,
    Query(query): Query<PostQuery>,
) -> ApiResult<Json<PostView>> {
    let view = posts
        .get_post_by_id(id, query.order.unwrap_or_default())
        .await?;
    Ok(Json(view))
}

/// get_comments
///
/// [Public Route] Comments of a post, oldest first. 404 if the post has none.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Post missing or without comments", body = ErrorResponse)
    )
)]
pub async fn get_comments(
    State(reactions): State<ReactionService>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(reactions.get_comments(post_id).await?))
}

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_categories(State(posts): State<PostService>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(posts.get_categories().await?))
}

#[utoipa::path(
    get,
    path = "/tags",
    responses((status = 200, description = "Tags", body = [Tag]))
)]
pub async fn get_tags(State(posts): State<PostService>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(posts.get_tags().await?))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The stored profile of the caller.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(repo): State<RepositoryState>,
) -> ApiResult<Json<User>> {
    repo.get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))
}

/// create_comment
///
/// [Authenticated Route] Comments on a post as the caller.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment Added", body = CommentView),
        (status = 404, description = "Post Not Found", body = ErrorResponse)
    )
)]
pub async fn create_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<Json<CommentView>> {
    let input = CommentInput {
        user_id,
        description: payload.description,
    };
    Ok(Json(reactions.create_comment(post_id, input).await?))
}

/// create_recomment
///
/// [Authenticated Route] Replies to a top-level comment of the same post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments/{comment_id}/replies",
    params(
        ("id" = Uuid, Path, description = "Post ID"),
        ("comment_id" = Uuid, Path, description = "Parent Comment ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Reply Added", body = CommentView),
        (status = 400, description = "Parent is a reply or on another post", body = ErrorResponse),
        (status = 404, description = "Post or Comment Not Found", body = ErrorResponse)
    )
)]
pub async fn create_recomment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<Json<CommentView>> {
    let input = CommentInput {
        user_id,
        description: payload.description,
    };
    Ok(Json(
        reactions
            .create_recomment(post_id, comment_id, input)
            .await?,
    ))
}

/// update_comment
///
/// [Authenticated Route] Edits a comment. Only its author may do so.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Whether a row changed", body = bool),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<Json<bool>> {
    let input = CommentInput {
        user_id,
        description: payload.description,
    };
    Ok(Json(reactions.update_comment(id, input).await?))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment (and its replies). Only its author may do so.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Whether a row was deleted", body = bool),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    Ok(Json(reactions.delete_comment(id, user_id).await?))
}

/// create_like
///
/// [Authenticated Route] Adds the caller to the post's likers. Repeating it is harmless.
#[utoipa::path(
    post,
    path = "/posts/{id}/likes",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Liked", body = bool),
        (status = 404, description = "Post Not Found", body = ErrorResponse)
    )
)]
pub async fn create_like(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    Ok(Json(reactions.create_like(post_id, user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/likes",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Unliked", body = bool),
        (status = 404, description = "Post Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_like(
    AuthUser { id: user_id, .. }: AuthUser,
    State(reactions): State<ReactionService>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    Ok(Json(reactions.delete_like(post_id, user_id).await?))
}

// --- Admin Handlers ---

/// create_post
///
/// [Admin Route] Publishes a post. `tags` is free text scanned for `#words`.
#[utoipa::path(
    post,
    path = "/admin/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Created", body = PostView),
        (status = 403, description = "Not ADMIN", body = ErrorResponse),
        (status = 404, description = "Category Not Found", body = ErrorResponse)
    )
)]
pub async fn create_post(
    actor: AuthUser,
    State(posts): State<PostService>,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(posts.create_post(Some(&actor), payload).await?))
}

/// update_post
///
/// [Admin Route] Partial update. A `tags` value replaces the whole tag set.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Whether a row changed", body = bool),
        (status = 403, description = "Not ADMIN", body = ErrorResponse),
        (status = 404, description = "Post or Category Not Found", body = ErrorResponse)
    )
)]
pub async fn update_post(
    actor: AuthUser,
    State(posts): State<PostService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> ApiResult<Json<bool>> {
    Ok(Json(posts.update_post(Some(&actor), id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Whether a row was deleted", body = bool),
        (status = 403, description = "Not ADMIN", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    actor: AuthUser,
    State(posts): State<PostService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    Ok(Json(posts.delete_post(Some(&actor), id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Created", body = Category),
        (status = 400, description = "Empty name", body = ErrorResponse),
        (status = 403, description = "Not ADMIN", body = ErrorResponse)
    )
)]
pub async fn create_category(
    actor: AuthUser,
    State(posts): State<PostService>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    Ok(Json(posts.create_category(Some(&actor), &payload.name).await?))
}
