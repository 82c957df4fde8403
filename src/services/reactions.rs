use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Comment, CommentInput, CommentView, NewComment, Post},
    repository::RepositoryState,
};

const POST_NOT_FOUND: &str = "post does not exist";
const COMMENT_NOT_FOUND: &str = "comment does not exist";
const NO_COMMENTS: &str = "no comments exist for this post";
const NOT_COMMENT_OWNER: &str = "no permission for this comment";

/// ReactionService
///
/// Comments, replies and likes. Comment mutations are owner-only; the ADMIN grant does
/// not bypass the ownership check.
#[derive(Clone)]
pub struct ReactionService {
    repo: RepositoryState,
}

impl ReactionService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// get_comments
    ///
    /// A post without comments is reported as `NotFound`, not as an empty list.
    pub async fn get_comments(&self, post_id: Uuid) -> ApiResult<Vec<Comment>> {
        self.require_post(post_id).await?;
        let comments = self.repo.get_comments(post_id).await?;
        if comments.is_empty() {
            return Err(ApiError::NotFound(NO_COMMENTS.into()));
        }
        Ok(comments)
    }

    pub async fn create_comment(&self, post_id: Uuid, input: CommentInput) -> ApiResult<CommentView> {
        self.require_post(post_id).await?;
        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                user_id: input.user_id,
                description: input.description,
                parent_id: None,
            })
            .await?;
        tracing::info!(comment_id = %comment.id, %post_id, "comment created");
        Ok(comment)
    }

    /// create_recomment
    ///
    /// Replies are one level deep: the parent must be a top-level comment of the same post.
    pub async fn create_recomment(
        &self,
        post_id: Uuid,
        parent_id: Uuid,
        input: CommentInput,
    ) -> ApiResult<CommentView> {
        self.require_post(post_id).await?;
        let parent = self.require_comment(parent_id).await?;
        if parent.post_id != post_id {
            return Err(ApiError::Validation(
                "parent comment belongs to another post".into(),
            ));
        }
        if parent.parent_id.is_some() {
            return Err(ApiError::Validation("cannot reply to a reply".into()));
        }

        let reply = self
            .repo
            .create_comment(NewComment {
                post_id,
                user_id: input.user_id,
                description: input.description,
                parent_id: Some(parent.id),
            })
            .await?;
        tracing::info!(comment_id = %reply.id, %parent_id, %post_id, "reply created");
        Ok(reply)
    }

    pub async fn update_comment(&self, comment_id: Uuid, input: CommentInput) -> ApiResult<bool> {
        let comment = self.require_comment(comment_id).await?;
        require_owner(&comment, input.user_id)?;

        let updated = self
            .repo
            .update_comment(comment_id, &input.description)
            .await?;
        tracing::info!(%comment_id, updated, "comment updated");
        Ok(updated)
    }

    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        let comment = self.require_comment(comment_id).await?;
        require_owner(&comment, user_id)?;

        let deleted = self.repo.delete_comment(comment_id).await?;
        tracing::info!(%comment_id, deleted, "comment deleted");
        Ok(deleted)
    }

    // Liking twice is not an error; the gateway ignores the duplicate.
    pub async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        self.require_post(post_id).await?;
        self.repo.add_liker(post_id, user_id).await?;
        Ok(true)
    }

    pub async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        self.require_post(post_id).await?;
        self.repo.remove_liker(post_id, user_id).await?;
        Ok(true)
    }

    async fn require_post(&self, id: Uuid) -> ApiResult<Post> {
        self.repo
            .get_post(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.into()))
    }

    async fn require_comment(&self, id: Uuid) -> ApiResult<Comment> {
        self.repo
            .get_comment(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(COMMENT_NOT_FOUND.into()))
    }
}

fn require_owner(comment: &Comment, user_id: Uuid) -> ApiResult<()> {
    if comment.user_id == user_id {
        Ok(())
    } else {
        Err(ApiError::Authorization(NOT_COMMENT_OWNER.into()))
    }
}
