use crate::{
    models::{
        Category, CategorySummary, Comment, CommentView, CreatePostRequest, Grant, NewComment,
        Post, PostOrder, PostView, Tag, UpdatePostRequest, User, UserSummary,
    },
    repository::{Repository, RepositoryError, RepositoryResult},
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use uuid::Uuid;

const DEV_ADMIN_NICKNAME: &str = "dev-admin";

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: Vec<Category>,
    // Insertion order doubles as the creation-time tiebreaker.
    posts: Vec<Post>,
    tags: Vec<Tag>,
    post_tags: Vec<(Uuid, Uuid)>,
    post_likes: HashSet<(Uuid, Uuid)>,
    comments: Vec<Comment>,
}

/// MemoryRepository
///
/// An in-process implementation of `Repository`. Used by the test suites and by local
/// runs started without a `DATABASE_URL`. Every mutation bumps a write counter, and
/// failures can be switched on to exercise the error paths of the workflows.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    tags_unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// with_dev_admin
    ///
    /// A fresh store holding a single ADMIN user, so a local server started without a
    /// database can be driven through the `x-user-id` bypass. `id` is random when `None`.
    pub async fn with_dev_admin(id: Option<Uuid>) -> RepositoryResult<(Self, User)> {
        let repo = Self::new();
        let admin = repo
            .create_user(User {
                id: id.unwrap_or_else(Uuid::new_v4),
                nickname: DEV_ADMIN_NICKNAME.to_string(),
                grant: Grant::Admin,
                ..Default::default()
            })
            .await?;
        Ok((repo, admin))
    }

    /// Number of mutating calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// When set, every call fails with `RepositoryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// When set, only `attach_tags` fails.
    pub fn set_tags_unavailable(&self, unavailable: bool) {
        self.tags_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Tag ids currently linked to a post, in link order.
    pub fn post_tag_ids(&self, post_id: Uuid) -> Vec<Uuid> {
        self.lock()
            .post_tags
            .iter()
            .filter(|(post, _)| *post == post_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    /// Every tag ever created, linked or not.
    pub fn all_tags(&self) -> Vec<Tag> {
        self.lock().tags.clone()
    }

    pub fn likers(&self, post_id: Uuid) -> Vec<Uuid> {
        self.lock()
            .post_likes
            .iter()
            .filter(|(post, _)| *post == post_id)
            .map(|(_, user)| *user)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> RepositoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn record_write(&self) -> RepositoryResult<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Tables {
    fn post_view(&self, post: &Post) -> Option<PostView> {
        let user = self.users.get(&post.user_id)?;
        let category = self.categories.iter().find(|c| c.id == post.category_id)?;

        let mut tags: Vec<Tag> = self
            .post_tags
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .filter_map(|(_, tag_id)| self.tags.iter().find(|t| t.id == *tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Some(PostView {
            id: post.id,
            title: post.title.clone(),
            description: post.description.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
            user: UserSummary {
                id: user.id,
                nickname: user.nickname.clone(),
            },
            category: CategorySummary {
                id: category.id,
                name: category.name.clone(),
            },
            tags,
        })
    }

    fn find_or_create_tag(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.tags.iter().find(|t| t.name == name) {
            return tag.clone();
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        self.check()?;
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        self.record_write()?;
        let user = User {
            created_at: Utc::now(),
            ..user
        };
        self.lock().users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_category(&self, id: Uuid) -> RepositoryResult<Option<Category>> {
        self.check()?;
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.check()?;
        let mut categories = self.lock().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> RepositoryResult<Category> {
        self.record_write()?;
        let mut tables = self.lock();
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(RepositoryError::Constraint(format!(
                "category name already taken: {name}"
            )));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        self.check()?;
        Ok(self.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_post_views(
        &self,
        id: Option<Uuid>,
        order: PostOrder,
    ) -> RepositoryResult<Vec<PostView>> {
        self.check()?;
        let tables = self.lock();

        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| id.is_none_or(|id| p.id == id))
            .collect();
        // Stable sort, so equal timestamps keep insertion order before reversing.
        posts.sort_by_key(|p| p.created_at);
        if order == PostOrder::Desc {
            posts.reverse();
        }

        Ok(posts.into_iter().filter_map(|p| tables.post_view(p)).collect())
    }

    async fn create_post(&self, user_id: Uuid, req: &CreatePostRequest) -> RepositoryResult<Post> {
        self.record_write()?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: req.title.clone(),
            description: req.description.clone(),
            user_id,
            category_id: req.category_id,
            created_at: now,
            updated_at: now,
        };
        self.lock().posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, req: &UpdatePostRequest) -> RepositoryResult<bool> {
        self.record_write()?;
        let mut tables = self.lock();
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if let Some(title) = &req.title {
            post.title = title.clone();
        }
        if let Some(description) = &req.description {
            post.description = description.clone();
        }
        if let Some(category_id) = req.category_id {
            post.category_id = category_id;
        }
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool> {
        self.record_write()?;
        let mut tables = self.lock();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Ok(false);
        }
        // Same cascade as the foreign keys in the SQL schema. Tags themselves stay.
        tables.post_tags.retain(|(post_id, _)| *post_id != id);
        tables.post_likes.retain(|(post_id, _)| *post_id != id);
        tables.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn get_tags(&self) -> RepositoryResult<Vec<Tag>> {
        self.check()?;
        let mut tags = self.lock().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn attach_tags(
        &self,
        post_id: Uuid,
        names: &[String],
        replace: bool,
    ) -> RepositoryResult<Vec<Tag>> {
        if self.tags_unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("tag table switched off".into()));
        }
        self.record_write()?;

        // One lock for the whole association keeps it all-or-nothing.
        let mut tables = self.lock();
        if replace {
            tables.post_tags.retain(|(post, _)| *post != post_id);
        }

        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let tag = tables.find_or_create_tag(name);
            if !tables.post_tags.contains(&(post_id, tag.id)) {
                tables.post_tags.push((post_id, tag.id));
            }
            tags.push(tag);
        }
        Ok(tags)
    }

    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>> {
        self.check()?;
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn get_comments(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>> {
        self.check()?;
        let mut comments: Vec<Comment> = self
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<CommentView> {
        self.record_write()?;
        let mut tables = self.lock();
        let Some(user) = tables.users.get(&comment.user_id).cloned() else {
            return Err(RepositoryError::Constraint(format!(
                "comment author {} does not exist",
                comment.user_id
            )));
        };

        let now = Utc::now();
        let row = Comment {
            id: Uuid::new_v4(),
            description: comment.description,
            user_id: comment.user_id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(row.clone());

        Ok(CommentView {
            id: row.id,
            description: row.description,
            post_id: row.post_id,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: user.id,
                nickname: user.nickname,
            },
        })
    }

    async fn update_comment(&self, id: Uuid, description: &str) -> RepositoryResult<bool> {
        self.record_write()?;
        let mut tables = self.lock();
        let Some(comment) = tables.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        comment.description = description.to_string();
        comment.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool> {
        self.record_write()?;
        let mut tables = self.lock();
        let before = tables.comments.len();
        // Replies go with their parent, as with ON DELETE CASCADE.
        tables
            .comments
            .retain(|c| c.id != id && c.parent_id != Some(id));
        Ok(tables.comments.len() < before)
    }

    async fn add_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        self.record_write()?;
        Ok(self.lock().post_likes.insert((post_id, user_id)))
    }

    async fn remove_liker(&self, post_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        self.record_write()?;
        Ok(self.lock().post_likes.remove(&(post_id, user_id)))
    }
}
