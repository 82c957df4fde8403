use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Category, CreatePostRequest, PostOrder, PostView, Tag, UpdatePostRequest},
    repository::RepositoryState,
    tags::{self, TagMode},
};

const MUST_BE_ADMIN: &str = "must be ADMIN";
const POST_NOT_FOUND: &str = "post does not exist";
const CATEGORY_NOT_FOUND: &str = "category does not exist";
const NO_POSTS: &str = "no posts exist";

/// PostService
///
/// Post workflow: every mutation is admin-only, and every read returns hydrated views.
#[derive(Clone)]
pub struct PostService {
    repo: RepositoryState,
}

impl PostService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn get_posts(&self, order: PostOrder) -> ApiResult<Vec<PostView>> {
        let posts = self.repo.find_post_views(None, order).await?;
        if posts.is_empty() {
            return Err(ApiError::NotFound(NO_POSTS.into()));
        }
        Ok(posts)
    }

    pub async fn get_post_by_id(&self, id: Uuid, order: PostOrder) -> ApiResult<PostView> {
        self.repo
            .find_post_views(Some(id), order)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.into()))
    }

    /// create_post
    ///
    /// Post row first, then tags. The two steps are not atomic: if tagging fails the
    /// post stays, untagged, and the caller gets the tag error.
    pub async fn create_post(
        &self,
        actor: Option<&AuthUser>,
        input: CreatePostRequest,
    ) -> ApiResult<PostView> {
        let actor = require_admin(actor)?;
        self.require_category(input.category_id).await?;

        let post = self.repo.create_post(actor.id, &input).await?;
        if let Some(text) = input.tags.as_deref() {
            tags::attach_tags(self.repo.as_ref(), post.id, text, TagMode::Append).await?;
        }
        tracing::info!(post_id = %post.id, user_id = %actor.id, "post created");

        self.get_post_by_id(post.id, PostOrder::default()).await
    }

    /// update_post
    ///
    /// A non-empty `tags` value replaces the whole tag set before the field update. Text
    /// without any `#token` therefore clears the tags; an empty string leaves them alone.
    pub async fn update_post(
        &self,
        actor: Option<&AuthUser>,
        id: Uuid,
        input: UpdatePostRequest,
    ) -> ApiResult<bool> {
        let actor = require_admin(actor)?;
        self.require_post(id).await?;
        if let Some(category_id) = input.category_id {
            self.require_category(category_id).await?;
        }

        if let Some(text) = input.tags.as_deref().filter(|t| !t.is_empty()) {
            tags::attach_tags(self.repo.as_ref(), id, text, TagMode::Replace).await?;
        }

        let updated = self.repo.update_post(id, &input).await?;
        tracing::info!(post_id = %id, user_id = %actor.id, updated, "post updated");
        Ok(updated)
    }

    pub async fn delete_post(&self, actor: Option<&AuthUser>, id: Uuid) -> ApiResult<bool> {
        let actor = require_admin(actor)?;
        self.require_post(id).await?;

        let deleted = self.repo.delete_post(id).await?;
        tracing::info!(post_id = %id, user_id = %actor.id, deleted, "post deleted");
        Ok(deleted)
    }

    pub async fn get_categories(&self) -> ApiResult<Vec<Category>> {
        Ok(self.repo.get_categories().await?)
    }

    pub async fn create_category(
        &self,
        actor: Option<&AuthUser>,
        name: &str,
    ) -> ApiResult<Category> {
        require_admin(actor)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("category name must not be empty".into()));
        }
        Ok(self.repo.create_category(name).await?)
    }

    pub async fn get_tags(&self) -> ApiResult<Vec<Tag>> {
        Ok(self.repo.get_tags().await?)
    }

    async fn require_post(&self, id: Uuid) -> ApiResult<()> {
        match self.repo.get_post(id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(POST_NOT_FOUND.into())),
        }
    }

    async fn require_category(&self, id: Uuid) -> ApiResult<()> {
        match self.repo.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(CATEGORY_NOT_FOUND.into())),
        }
    }
}

fn require_admin(actor: Option<&AuthUser>) -> ApiResult<&AuthUser> {
    match actor {
        Some(actor) if actor.is_admin() => Ok(actor),
        _ => Err(ApiError::Authorization(MUST_BE_ADMIN.into())),
    }
}
