use blog_api::{
    ApiError, MemoryRepository, PostService,
    auth::AuthUser,
    models::{Category, CreatePostRequest, Grant, PostOrder, UpdatePostRequest, User},
    repository::{Repository, RepositoryState},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Fixtures ---

struct Fixture {
    repo: Arc<MemoryRepository>,
    service: PostService,
    admin: AuthUser,
    reader: AuthUser,
    category: Category,
}

async fn seed_user(repo: &MemoryRepository, nickname: &str, grant: Grant) -> AuthUser {
    let user = repo
        .create_user(User {
            id: Uuid::new_v4(),
            nickname: nickname.to_string(),
            grant,
            ..Default::default()
        })
        .await
        .unwrap();
    AuthUser {
        id: user.id,
        grant: user.grant,
    }
}

async fn setup() -> Fixture {
    let repo = Arc::new(MemoryRepository::new());
    let admin = seed_user(&repo, "editor", Grant::Admin).await;
    let reader = seed_user(&repo, "reader", Grant::Normal).await;
    let category = repo.create_category("engineering").await.unwrap();

    let service = PostService::new(repo.clone() as RepositoryState);
    Fixture {
        repo,
        service,
        admin,
        reader,
        category,
    }
}

fn new_post(category_id: Uuid, tags: Option<&str>) -> CreatePostRequest {
    CreatePostRequest {
        title: "Shipping a blog".to_string(),
        description: "Notes from the first release".to_string(),
        tags: tags.map(str::to_string),
        category_id,
    }
}

fn tag_names(view: &blog_api::models::PostView) -> Vec<String> {
    view.tags.iter().map(|t| t.name.clone()).collect()
}

// --- createPost ---

#[tokio::test]
async fn test_create_post_hydrates_author_category_and_tags() {
    let fx = setup().await;

    let view = fx
        .service
        .create_post(
            Some(&fx.admin),
            new_post(fx.category.id, Some("#News #sports")),
        )
        .await
        .unwrap();

    assert_eq!(view.title, "Shipping a blog");
    assert_eq!(view.user.id, fx.admin.id);
    assert_eq!(view.user.nickname, "editor");
    assert_eq!(view.category.id, fx.category.id);
    assert_eq!(view.category.name, "engineering");
    assert_eq!(tag_names(&view), vec!["news", "sports"]);
}

#[tokio::test]
async fn test_create_post_collapses_duplicate_tags() {
    let fx = setup().await;

    let view = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#a #a #A")))
        .await
        .unwrap();

    assert_eq!(tag_names(&view), vec!["a"]);
    assert_eq!(fx.repo.all_tags().len(), 1);
    assert_eq!(fx.repo.post_tag_ids(view.id).len(), 1);
}

#[tokio::test]
async fn test_create_post_reuses_existing_tags() {
    let fx = setup().await;

    let first = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#rust")))
        .await
        .unwrap();
    let second = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#Rust #web")))
        .await
        .unwrap();

    assert_eq!(fx.repo.all_tags().len(), 2);
    assert_eq!(first.tags[0].id, second.tags[0].id);
}

#[tokio::test]
async fn test_create_post_without_tags() {
    let fx = setup().await;

    let view = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, None))
        .await
        .unwrap();

    assert!(view.tags.is_empty());
    assert!(fx.repo.all_tags().is_empty());
}

#[tokio::test]
async fn test_create_post_rejects_normal_user_without_writing() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .create_post(Some(&fx.reader), new_post(fx.category.id, Some("#x")))
        .await;

    assert!(matches!(result, Err(ApiError::Authorization(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_create_post_rejects_missing_actor() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .create_post(None, new_post(fx.category.id, None))
        .await;

    assert!(matches!(result, Err(ApiError::Authorization(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_create_post_unknown_category_is_not_found() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .create_post(Some(&fx.admin), new_post(Uuid::new_v4(), Some("#x")))
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("category does not exist".into())
    );
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_create_post_tag_failure_is_reported() {
    let fx = setup().await;
    fx.repo.set_tags_unavailable(true);

    let result = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#breaks")))
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::Persistence("tag operation failed")
    );
}

#[tokio::test]
async fn test_store_failure_is_opaque() {
    let fx = setup().await;
    fx.repo.set_unavailable(true);

    let result = fx.service.get_posts(PostOrder::Desc).await;

    assert_eq!(result.unwrap_err(), ApiError::Persistence("database error"));
}

// --- getPosts / getPostById ---

#[tokio::test]
async fn test_get_posts_empty_is_not_found() {
    let fx = setup().await;

    let result = fx.service.get_posts(PostOrder::Desc).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_get_posts_respects_order() {
    let fx = setup().await;
    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let mut req = new_post(fx.category.id, None);
        req.title = title.to_string();
        let view = fx.service.create_post(Some(&fx.admin), req).await.unwrap();
        ids.push(view.id);
    }

    let asc: Vec<Uuid> = fx
        .service
        .get_posts(PostOrder::Asc)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    let desc: Vec<Uuid> = fx
        .service
        .get_posts(PostOrder::Desc)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(asc, ids);
    let mut reversed = ids.clone();
    reversed.reverse();
    assert_eq!(desc, reversed);
}

#[tokio::test]
async fn test_get_post_by_id_missing_is_not_found() {
    let fx = setup().await;

    let result = fx
        .service
        .get_post_by_id(Uuid::new_v4(), PostOrder::Desc)
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("post does not exist".into())
    );
}

// --- updatePost ---

#[tokio::test]
async fn test_update_post_replaces_tags_and_fields() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#old #keep")))
        .await
        .unwrap();

    let updated = fx
        .service
        .update_post(
            Some(&fx.admin),
            created.id,
            UpdatePostRequest {
                title: Some("Renamed".to_string()),
                tags: Some("#keep #new".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let view = fx
        .service
        .get_post_by_id(created.id, PostOrder::Desc)
        .await
        .unwrap();
    assert_eq!(view.title, "Renamed");
    assert_eq!(view.description, created.description);
    assert_eq!(tag_names(&view), vec!["keep", "new"]);
    // The dropped tag survives as a row, only its link is gone.
    assert_eq!(fx.repo.all_tags().len(), 3);
}

#[tokio::test]
async fn test_update_post_empty_tags_leave_links_alone() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#stay")))
        .await
        .unwrap();

    fx.service
        .update_post(
            Some(&fx.admin),
            created.id,
            UpdatePostRequest {
                tags: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(fx.repo.post_tag_ids(created.id).len(), 1);
}

#[tokio::test]
async fn test_update_post_text_without_hashtags_clears_tags() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#gone")))
        .await
        .unwrap();

    fx.service
        .update_post(
            Some(&fx.admin),
            created.id,
            UpdatePostRequest {
                tags: Some("plain words".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(fx.repo.post_tag_ids(created.id).is_empty());
}

#[tokio::test]
async fn test_update_post_missing_is_not_found_without_writes() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .update_post(
            Some(&fx.admin),
            Uuid::new_v4(),
            UpdatePostRequest {
                tags: Some("#x".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_update_post_unknown_category_is_not_found() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, None))
        .await
        .unwrap();

    let result = fx
        .service
        .update_post(
            Some(&fx.admin),
            created.id,
            UpdatePostRequest {
                category_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::NotFound("category does not exist".into())
    );
}

#[tokio::test]
async fn test_update_post_rejects_normal_user() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, None))
        .await
        .unwrap();
    let writes_before = fx.repo.write_count();

    let result = fx
        .service
        .update_post(
            Some(&fx.reader),
            created.id,
            UpdatePostRequest {
                title: Some("hijacked".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(ApiError::Authorization(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

// --- deletePost ---

#[tokio::test]
async fn test_delete_post_removes_it() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, Some("#t")))
        .await
        .unwrap();

    let deleted = fx
        .service
        .delete_post(Some(&fx.admin), created.id)
        .await
        .unwrap();

    assert!(deleted);
    assert!(fx.repo.post_tag_ids(created.id).is_empty());
    assert!(matches!(
        fx.service.get_post_by_id(created.id, PostOrder::Desc).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_post_missing_is_not_found_without_writes() {
    let fx = setup().await;
    let writes_before = fx.repo.write_count();

    let result = fx.service.delete_post(Some(&fx.admin), Uuid::new_v4()).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(fx.repo.write_count(), writes_before);
}

#[tokio::test]
async fn test_delete_post_rejects_normal_user() {
    let fx = setup().await;
    let created = fx
        .service
        .create_post(Some(&fx.admin), new_post(fx.category.id, None))
        .await
        .unwrap();

    let result = fx.service.delete_post(Some(&fx.reader), created.id).await;

    assert!(matches!(result, Err(ApiError::Authorization(_))));
    assert!(fx.repo.get_post(created.id).await.unwrap().is_some());
}

// --- Categories ---

#[tokio::test]
async fn test_create_category_requires_admin_and_name() {
    let fx = setup().await;

    let denied = fx.service.create_category(Some(&fx.reader), "news").await;
    assert!(matches!(denied, Err(ApiError::Authorization(_))));

    let blank = fx.service.create_category(Some(&fx.admin), "   ").await;
    assert!(matches!(blank, Err(ApiError::Validation(_))));

    let created = fx
        .service
        .create_category(Some(&fx.admin), " news ")
        .await
        .unwrap();
    assert_eq!(created.name, "news");

    let names: Vec<String> = fx
        .service
        .get_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["engineering", "news"]);
}
