use crate::models::{
    Category, CategorySummary, Comment, CommentView, CreatePostRequest, NewComment, Post,
    PostOrder, PostView, Tag, UpdatePostRequest, User, UserSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Raised only for genuine gateway failures. A lookup that matches nothing is `Ok(None)`
/// or an empty `Vec`, never an error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence gateway: per-entity lookups and mutations plus explicit relation
/// helpers for Post–Tag, Post–Comment and Post–Liker. Workflows only ever talk to this
/// trait, so tests swap in [`crate::memory::MemoryRepository`].
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    async fn create_user(&self, user: User) -> RepositoryResult<User>;

    // --- Categories ---
    async fn get_category(&self, id: Uuid) -> RepositoryResult<Option<Category>>;
    async fn get_categories(&self) -> RepositoryResult<Vec<Category>>;
    async fn create_category(&self, name: &str) -> RepositoryResult<Category>;

    // --- Posts ---
    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>>;
    // Hydrated posts (author, category, tags), optionally narrowed to a single id.
    async fn find_post_views(
        &self,
        id: Option<Uuid>,
        order: PostOrder,
    ) -> RepositoryResult<Vec<PostView>>;
    async fn create_post(&self, user_id: Uuid, req: &CreatePostRequest) -> RepositoryResult<Post>;
    // Returns true if a row was changed. `tags` is ignored here; see `attach_tags`.
    async fn update_post(&self, id: Uuid, req: &UpdatePostRequest) -> RepositoryResult<bool>;
    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool>;

    // --- Tags ---
    async fn get_tags(&self) -> RepositoryResult<Vec<Tag>>;
    /// Find-or-creates every name and links the tags to the post, atomically.
    /// With `replace`, existing links are removed first.
    async fn attach_tags(
        &self,
        post_id: Uuid,
        names: &[String],
        replace: bool,
    ) -> RepositoryResult<Vec<Tag>>;

    // --- Comments ---
    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>>;
    async fn get_comments(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<CommentView>;
    async fn update_comment(&self, id: Uuid, description: &str) -> RepositoryResult<bool>;
    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool>;

    // --- Likes ---
    // Idempotent: liking twice or unliking a post never liked is not an error.
    async fn add_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool>;
    async fn remove_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

// Flat row produced by the post/user/category join.
#[derive(FromRow)]
struct PostViewRow {
    id: Uuid,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_nickname: String,
    category_id: Uuid,
    category_name: String,
}

#[derive(FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(FromRow)]
struct CommentViewRow {
    id: Uuid,
    description: String,
    post_id: Uuid,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_nickname: String,
}

impl From<CommentViewRow> for CommentView {
    fn from(row: CommentViewRow) -> Self {
        CommentView {
            id: row.id,
            description: row.description,
            post_id: row.post_id,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: row.user_id,
                nickname: row.user_nickname,
            },
        }
    }
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, nickname, grant_level, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Mirrors an identity issued by the auth provider. Re-registering the same id
    /// refreshes nickname and grant.
    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, nickname, grant_level) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET nickname = EXCLUDED.nickname, grant_level = EXCLUDED.grant_level
            RETURNING id, nickname, grant_level, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.nickname)
        .bind(user.grant.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_category(&self, id: Uuid) -> RepositoryResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    async fn get_categories(&self) -> RepositoryResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> RepositoryResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"SELECT id, title, description, user_id, category_id, created_at, updated_at
               FROM posts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    /// find_post_views
    ///
    /// Two round trips: the post/user/category join, then every tag of the returned posts
    /// in one `ANY($1)` query, stitched together in memory.
    async fn find_post_views(
        &self,
        id: Option<Uuid>,
        order: PostOrder,
    ) -> RepositoryResult<Vec<PostView>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                p.id, p.title, p.description, p.created_at, p.updated_at,
                u.id AS user_id, u.nickname AS user_nickname,
                c.id AS category_id, c.name AS category_name
            FROM posts p
            JOIN users u ON u.id = p.user_id
            JOIN categories c ON c.id = p.category_id
            "#,
        );

        if let Some(id) = id {
            builder.push(" WHERE p.id = ");
            builder.push_bind(id);
        }

        builder.push(" ORDER BY p.created_at ");
        builder.push(order.as_sql());

        let rows = builder
            .build_query_as::<PostViewRow>()
            .fetch_all(&self.pool)
            .await?;

        let post_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let tag_rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags_by_post.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| PostView {
                tags: tags_by_post.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description,
                created_at: row.created_at,
                updated_at: row.updated_at,
                user: UserSummary {
                    id: row.user_id,
                    nickname: row.user_nickname,
                },
                category: CategorySummary {
                    id: row.category_id,
                    name: row.category_name,
                },
            })
            .collect())
    }

    async fn create_post(&self, user_id: Uuid, req: &CreatePostRequest) -> RepositoryResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, description, user_id, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, title, description, user_id, category_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.description)
        .bind(user_id)
        .bind(req.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    /// update_post
    ///
    /// Uses `COALESCE` so that only the fields present in `req` are overwritten.
    async fn update_post(&self, id: Uuid, req: &UpdatePostRequest) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.title.as_deref())
        .bind(req.description.as_deref())
        .bind(req.category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_tags(&self) -> RepositoryResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    /// attach_tags
    ///
    /// Runs in one transaction. The no-op `DO UPDATE` makes `RETURNING` yield the existing
    /// row when the name is already taken.
    async fn attach_tags(
        &self,
        post_id: Uuid,
        names: &[String],
        replace: bool,
    ) -> RepositoryResult<Vec<Tag>> {
        let mut tx = self.pool.begin().await?;

        if replace {
            sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let tag = sqlx::query_as::<_, Tag>(
                r#"
                INSERT INTO tags (id, name) VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;

            tags.push(tag);
        }

        tx.commit().await?;
        Ok(tags)
    }

    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"SELECT id, description, user_id, post_id, parent_id, created_at, updated_at
               FROM comments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comments(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"SELECT id, description, user_id, post_id, parent_id, created_at, updated_at
               FROM comments WHERE post_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// create_comment
    ///
    /// Inserts and joins with `users` in one statement (CTE) to return the author summary.
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<CommentView> {
        let row = sqlx::query_as::<_, CommentViewRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, description, user_id, post_id, parent_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                RETURNING id, description, user_id, post_id, parent_id, created_at, updated_at
            )
            SELECT i.id, i.description, i.post_id, i.parent_id, i.created_at, i.updated_at,
                   u.id AS user_id, u.nickname AS user_nickname
            FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&comment.description)
        .bind(comment.user_id)
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_comment(&self, id: Uuid, description: &str) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE comments SET description = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
