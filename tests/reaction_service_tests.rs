use blog_api::{
    ApiError, MemoryRepository, ReactionService,
    models::{Comment, CommentInput, CreatePostRequest, Grant, Post, User},
    repository::{Repository, RepositoryState},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Fixtures ---

struct Fixture {
    repo: Arc<MemoryRepository>,
    service: ReactionService,
    author: Uuid,
    other: Uuid,
    admin: Uuid,
    post: Post,
}

async fn seed_user(repo: &MemoryRepository, nickname: &str, grant: Grant) -> Uuid {
    repo.create_user(User {
        id: Uuid::new_v4(),
        nickname: nickname.to_string(),
        grant,
        ..Default::default()
    })
    .await
    .unwrap()
    .id
}

async fn seed_post(repo: &MemoryRepository, user_id: Uuid, category_id: Uuid) -> Post {
    repo.create_post(
        user_id,
        &CreatePostRequest {
            title: "Hello".to_string(),
            description: "World".to_string(),
            tags: None,
            category_id,
        },
    )
    .await
    .unwrap()
}

async fn setup() -> Fixture {
    let repo = Arc::new(MemoryRepository::new());
    let author = seed_user(&repo, "author", Grant::Normal).await;
    let other = seed_user(&repo, "other", Grant::Normal).await;
    let admin = seed_user(&repo, "admin", Grant::Admin).await;
    let category = repo.create_category("general").await.unwrap();
    let post = seed_post(&repo, admin, category.id).await;

    let service = ReactionService::new(repo.clone() as RepositoryState);
    Fixture {
        repo,
        service,
        author,
        other,
        admin,
        post,
    }
}

fn input(user_id: Uuid, description: &str) -> CommentInput {
    CommentInput {
        user_id,
        description: description.to_string(),
    }
}

async fn stored(repo: &MemoryRepository, id: Uuid) -> Option<Comment> {
    repo.get_comment(id).await.unwrap()
}

// --- Comments ---

#[tokio::test]
async fn test_create_comment_returns_author_summary() {
    let fx = setup().await;

    let view = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "first!"))
        .await
        .unwrap();

    assert_eq!(view.description, "first!");
    assert_eq!(view.post_id, fx.post.id);
    assert_eq!(view.parent_id, None);
    assert_eq!(view.user.id, fx.author);
    assert_eq!(view.user.nickname, "author");
}

#[tokio::test]
async fn test_create_comment_on_missing_post_is_not_found() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .create_comment(Uuid::new_v4(), input(fx.author, "lost"))
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_get_comments_without_any_is_not_found() {
    let fx = setup().await;

    let result = fx.service.get_comments(fx.post.id).await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("no comments exist for this post".into())
    );
}

#[tokio::test]
async fn test_get_comments_lists_comments_and_replies() {
    let fx = setup().await;
    let parent = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "parent"))
        .await
        .unwrap();
    fx.service
        .create_recomment(fx.post.id, parent.id, input(fx.other, "child"))
        .await
        .unwrap();

    let comments = fx.service.get_comments(fx.post.id).await.unwrap();

    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].description, "parent");
    assert_eq!(comments[1].parent_id, Some(parent.id));
}

#[tokio::test]
async fn test_update_comment_by_owner() {
    let fx = setup().await;
    let comment = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "typo"))
        .await
        .unwrap();

    let updated = fx
        .service
        .update_comment(comment.id, input(fx.author, "fixed"))
        .await
        .unwrap();

    assert!(updated);
    assert_eq!(
        stored(&fx.repo, comment.id).await.unwrap().description,
        "fixed"
    );
}

#[tokio::test]
async fn test_update_comment_by_admin_non_owner_is_denied() {
    let fx = setup().await;
    let comment = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "mine"))
        .await
        .unwrap();

    let result = fx
        .service
        .update_comment(comment.id, input(fx.admin, "moderated"))
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::Authorization("no permission for this comment".into())
    );
    assert_eq!(
        stored(&fx.repo, comment.id).await.unwrap().description,
        "mine"
    );
}

#[tokio::test]
async fn test_update_missing_comment_is_not_found() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .update_comment(Uuid::new_v4(), input(fx.author, "nothing"))
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_delete_missing_comment_is_not_found_without_writes() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx.service.delete_comment(Uuid::new_v4(), fx.author).await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("comment does not exist".into())
    );
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_delete_comment_by_non_owner_is_denied() {
    let fx = setup().await;
    let comment = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "keep me"))
        .await
        .unwrap();
    let writes_before = fx.repo.write_count();

    let result = fx.service.delete_comment(comment.id, fx.other).await;

    assert!(matches!(result, Err(ApiError::Authorization(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
    assert!(stored(&fx.repo, comment.id).await.is_some());
}

#[tokio::test]
async fn test_delete_comment_takes_replies_with_it() {
    let fx = setup().await;
    let parent = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "parent"))
        .await
        .unwrap();
    let reply = fx
        .service
        .create_recomment(fx.post.id, parent.id, input(fx.other, "reply"))
        .await
        .unwrap();

    let deleted = fx.service.delete_comment(parent.id, fx.author).await.unwrap();

    assert!(deleted);
    assert!(stored(&fx.repo, parent.id).await.is_none());
    assert!(stored(&fx.repo, reply.id).await.is_none());
}

// --- Recomments ---

#[tokio::test]
async fn test_create_recomment_links_parent() {
    let fx = setup().await;
    let parent = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "question"))
        .await
        .unwrap();

    let reply = fx
        .service
        .create_recomment(fx.post.id, parent.id, input(fx.other, "answer"))
        .await
        .unwrap();

    assert_eq!(reply.parent_id, Some(parent.id));
    assert_eq!(reply.post_id, fx.post.id);
    assert_eq!(reply.user.nickname, "other");
}

#[tokio::test]
async fn test_create_recomment_missing_parent_is_not_found() {
    let fx = setup().await;

    let result = fx
        .service
        .create_recomment(fx.post.id, Uuid::new_v4(), input(fx.other, "orphan"))
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("comment does not exist".into())
    );
}

#[tokio::test]
async fn test_create_recomment_rejects_reply_to_reply() {
    let fx = setup().await;
    let parent = fx
        .service
        .create_comment(fx.post.id, input(fx.author, "root"))
        .await
        .unwrap();
    let reply = fx
        .service
        .create_recomment(fx.post.id, parent.id, input(fx.other, "level one"))
        .await
        .unwrap();

    let result = fx
        .service
        .create_recomment(fx.post.id, reply.id, input(fx.author, "level two"))
        .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_create_recomment_rejects_parent_on_other_post() {
    let fx = setup().await;
    let category = fx.repo.create_category("elsewhere").await.unwrap();
    let other_post = seed_post(&fx.repo, fx.admin, category.id).await;
    let parent = fx
        .service
        .create_comment(other_post.id, input(fx.author, "over there"))
        .await
        .unwrap();

    let result = fx
        .service
        .create_recomment(fx.post.id, parent.id, input(fx.other, "cross-post"))
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::Validation("parent comment belongs to another post".into())
    );
}

// --- Likes ---

#[tokio::test]
async fn test_likes_are_idempotent() {
    let fx = setup().await;

    assert!(fx.service.create_like(fx.post.id, fx.author).await.unwrap());
    assert!(fx.service.create_like(fx.post.id, fx.author).await.unwrap());
    assert_eq!(fx.repo.likers(fx.post.id), vec![fx.author]);

    assert!(fx.service.delete_like(fx.post.id, fx.author).await.unwrap());
    assert!(fx.service.delete_like(fx.post.id, fx.author).await.unwrap());
    assert!(fx.repo.likers(fx.post.id).is_empty());
}

#[tokio::test]
async fn test_like_missing_post_is_not_found() {
    let fx = setup().await;

    let result = fx.service.create_like(Uuid::new_v4(), fx.author).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_unlike_missing_post_is_not_found() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx.service.delete_like(Uuid::new_v4(), fx.author).await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("post does not exist".into())
    );
    assert_eq!(fx.repo.write_count(), writes_before);
}
