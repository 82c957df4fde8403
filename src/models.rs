use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Grant
///
/// A user's authorization level. Only `ADMIN` may create, update or delete posts.
/// Stored as TEXT in the `users.grant_level` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Grant {
    Admin,
    #[default]
    Normal,
}

#[derive(Debug, Error)]
#[error("unknown grant level: {0}")]
pub struct UnknownGrant(pub String);

impl Grant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grant::Admin => "ADMIN",
            Grant::Normal => "NORMAL",
        }
    }
}

impl TryFrom<String> for Grant {
    type Error = UnknownGrant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ADMIN" => Ok(Grant::Admin),
            "NORMAL" => Ok(Grant::Normal),
            _ => Err(UnknownGrant(value)),
        }
    }
}

/// User
///
/// Mirror of the identity issued by the external auth provider, as stored in `users`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub nickname: String,
    // `grant` is a reserved word in SQL.
    #[sqlx(rename = "grant_level", try_from = "String")]
    pub grant: Grant,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Content Schemas (Mapped to Database) ---

/// Category
///
/// Every post belongs to exactly one category, which must exist before the post does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Tag
///
/// `name` is always the canonical lowercase form. Tags are created on first use and
/// are never deleted, even once no post references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Post
///
/// Raw row from `posts`. Handlers return the hydrated [`PostView`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    pub category_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// Raw row from `comments`. `parent_id` is set for replies ("recomments").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub description: String,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Hydrated Views (Output) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

/// PostView
///
/// A post joined with its author, its category and its tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    pub category: CategorySummary,
    pub tags: Vec<Tag>,
}

/// CommentView
///
/// A comment joined with its author.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentView {
    pub id: Uuid,
    pub description: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
}

// --- Request Payloads (Input Schemas) ---

/// PostOrder
///
/// Sort direction on post creation time. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostOrder {
    Asc,
    #[default]
    Desc,
}

impl PostOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PostOrder::Asc => "ASC",
            PostOrder::Desc => "DESC",
        }
    }
}

/// CreatePostRequest
///
/// `tags` is free text; every `#word` in it becomes a tag on the new post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub category_id: Uuid,
}

/// UpdatePostRequest
///
/// Partial update. When `tags` is given, the post's tag set is replaced, not merged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

/// CommentRequest
///
/// Body for creating, replying to and editing comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentRequest {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// CommentInput
///
/// Workflow-level comment payload: the body text plus the acting user.
#[derive(Debug, Clone, Default)]
pub struct CommentInput {
    pub user_id: Uuid,
    pub description: String,
}

/// NewComment
///
/// Everything the repository needs to insert a comment row.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub parent_id: Option<Uuid>,
}
