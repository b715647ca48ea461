use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use campus_server::application::post_service::PostService;
use campus_server::data::post_repository::PostRepository;
use campus_server::domain::error::DomainError;
use campus_server::domain::post::{
    Author, Comment, CommentAuthor, CommentDetail, Post, PostDetail,
};
use uuid::Uuid;

#[derive(Clone)]
struct SeedUser {
    id: Uuid,
    name: String,
    email: String,
    avatar: Option<String>,
}

fn seed_user(name: &str) -> SeedUser {
    SeedUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@campus.edu", name.to_lowercase()),
        avatar: None,
    }
}

struct StoredPost {
    post: Post,
    likes: Vec<Uuid>,
    comments: Vec<Comment>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, SeedUser>,
    posts: Vec<StoredPost>,
}

/// In-memory stand-in for the Postgres repository, mirroring its semantics:
/// conditional ownership updates, Forbidden/NotFound probes, no duplicate
/// likes.
#[derive(Default)]
struct MemoryPostRepository {
    inner: Mutex<Inner>,
}

impl MemoryPostRepository {
    fn with_users(users: &[SeedUser]) -> Self {
        let repo = Self::default();
        {
            let mut inner = repo.inner.lock().unwrap();
            for user in users {
                inner.users.insert(user.id, user.clone());
            }
        }
        repo
    }
}

fn detail_of(inner: &Inner, stored: &StoredPost) -> Result<PostDetail, DomainError> {
    let owner = inner
        .users
        .get(&stored.post.user_id)
        .ok_or_else(|| DomainError::Internal("owner missing".into()))?;

    let comments = stored
        .comments
        .iter()
        .map(|c| {
            let author = inner
                .users
                .get(&c.user_id)
                .ok_or_else(|| DomainError::Internal("comment author missing".into()))?;
            Ok(CommentDetail {
                id: c.id,
                user: CommentAuthor {
                    id: author.id,
                    name: author.name.clone(),
                    avatar: author.avatar.clone(),
                },
                text: c.text.clone(),
                created_at: c.created_at,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(PostDetail {
        id: stored.post.id,
        user: Author {
            id: owner.id,
            name: owner.name.clone(),
            email: owner.email.clone(),
            avatar: owner.avatar.clone(),
        },
        content: stored.post.content.clone(),
        image: stored.post.image.clone(),
        likes: stored.likes.clone(),
        comments,
        created_at: stored.post.created_at,
        updated_at: stored.post.updated_at,
    })
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, post: Post) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.posts.push(StoredPost {
            post,
            likes: Vec::new(),
            comments: Vec::new(),
        });
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .find(|s| s.post.id == id)
            .map(|s| s.post.clone()))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, DomainError> {
        let inner = self.inner.lock().unwrap();
        inner
            .posts
            .iter()
            .find(|s| s.post.id == id)
            .map(|s| detail_of(&inner, s))
            .transpose()
    }

    async fn list_details(&self) -> Result<Vec<PostDetail>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut details = inner
            .posts
            .iter()
            .map(|s| detail_of(&inner, s))
            .collect::<Result<Vec<_>, _>>()?;
        details.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(details)
    }

    async fn update_post(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: Option<String>,
        image: Option<String>,
    ) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner
            .posts
            .iter_mut()
            .find(|s| s.post.id == id && s.post.user_id == user_id)
        else {
            return Ok(false);
        };

        if let Some(content) = content {
            stored.post.content = content;
        }
        if let Some(image) = image {
            stored.post.image = Some(image);
        }
        stored.post.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner.posts.iter().position(|s| s.post.id == id) else {
            return Err(DomainError::PostNotFound(id));
        };
        if inner.posts[pos].post.user_id != user_id {
            return Err(DomainError::Forbidden("not authorized to delete this post"));
        }
        inner.posts.remove(pos);
        Ok(())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner.posts.iter_mut().find(|s| s.post.id == post_id) else {
            return Err(DomainError::PostNotFound(post_id));
        };
        if stored.likes.contains(&user_id) {
            return Ok(false);
        }
        stored.likes.push(user_id);
        Ok(true)
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner.posts.iter_mut().find(|s| s.post.id == post_id) else {
            return Ok(false);
        };
        let before = stored.likes.len();
        stored.likes.retain(|id| *id != user_id);
        Ok(stored.likes.len() < before)
    }

    async fn add_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner.posts.iter_mut().find(|s| s.post.id == post_id) else {
            return Err(DomainError::PostNotFound(post_id));
        };
        stored.comments.push(comment);
        Ok(())
    }

    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner.posts.iter_mut().find(|s| s.post.id == post_id) else {
            return Err(DomainError::PostNotFound(post_id));
        };
        let Some(pos) = stored.comments.iter().position(|c| c.id == comment_id) else {
            return Err(DomainError::CommentNotFound(comment_id));
        };
        if stored.comments[pos].user_id != user_id {
            return Err(DomainError::Forbidden(
                "not authorized to delete this comment",
            ));
        }
        stored.comments.remove(pos);
        Ok(())
    }
}

fn service_with(
    users: &[SeedUser],
) -> PostService<MemoryPostRepository> {
    PostService::new(Arc::new(MemoryPostRepository::with_users(users)))
}

#[tokio::test]
async fn create_requires_content_or_image() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let err = service.create_post(alice.id, "", None).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = service
        .create_post(alice.id, "   \t ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let post = service
        .create_post(alice.id, "", Some("/uploads/pic.png".into()))
        .await
        .unwrap();
    assert_eq!(post.content, "");
    assert_eq!(post.image.as_deref(), Some("/uploads/pic.png"));
}

#[tokio::test]
async fn create_then_get_round_trips_trimmed_content() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let created = service
        .create_post(alice.id, "  hello  ", None)
        .await
        .unwrap();
    let fetched = service.get_post(created.id).await.unwrap();

    assert_eq!(fetched.content, "hello");
    assert_eq!(fetched.user.id, alice.id);
    assert_eq!(fetched.user.name, "Alice");
    assert_eq!(fetched.user.email, "alice@campus.edu");
    assert!(fetched.likes.is_empty());
    assert!(fetched.comments.is_empty());
}

#[tokio::test]
async fn toggle_like_round_trips_membership() {
    let alice = seed_user("Alice");
    let bob = seed_user("Bob");
    let service = service_with(&[alice.clone(), bob.clone()]);

    let post = service.create_post(alice.id, "hello", None).await.unwrap();

    let liked = service.toggle_like(post.id, bob.id).await.unwrap();
    assert_eq!(liked.likes, vec![bob.id]);

    let unliked = service.toggle_like(post.id, bob.id).await.unwrap();
    assert!(unliked.likes.is_empty());

    // A fresh toggle likes again; membership never duplicates.
    let reliked = service.toggle_like(post.id, bob.id).await.unwrap();
    assert_eq!(reliked.likes, vec![bob.id]);
}

#[tokio::test]
async fn toggle_like_on_missing_post_is_not_found() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let err = service
        .toggle_like(Uuid::new_v4(), alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PostNotFound(_)));
}

#[tokio::test]
async fn update_by_non_owner_is_forbidden_and_leaves_post_unchanged() {
    let alice = seed_user("Alice");
    let bob = seed_user("Bob");
    let service = service_with(&[alice.clone(), bob.clone()]);

    let post = service.create_post(alice.id, "original", None).await.unwrap();

    let err = service
        .update_post(bob.id, post.id, Some("hijacked".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let unchanged = service.get_post(post.id).await.unwrap();
    assert_eq!(unchanged.content, "original");
}

#[tokio::test]
async fn update_replaces_only_supplied_fields() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let post = service
        .create_post(alice.id, "first", Some("/uploads/a.png".into()))
        .await
        .unwrap();

    let updated = service
        .update_post(alice.id, post.id, Some("second".into()), None)
        .await
        .unwrap();
    assert_eq!(updated.content, "second");
    assert_eq!(updated.image.as_deref(), Some("/uploads/a.png"));

    let updated = service
        .update_post(alice.id, post.id, None, Some("/uploads/b.png".into()))
        .await
        .unwrap();
    assert_eq!(updated.content, "second");
    assert_eq!(updated.image.as_deref(), Some("/uploads/b.png"));
}

#[tokio::test]
async fn update_cannot_strip_post_to_nothing() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let post = service.create_post(alice.id, "words only", None).await.unwrap();

    let err = service
        .update_post(alice.id, post.id, Some("   ".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let unchanged = service.get_post(post.id).await.unwrap();
    assert_eq!(unchanged.content, "words only");
}

#[tokio::test]
async fn update_trims_supplied_content() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let post = service.create_post(alice.id, "first", None).await.unwrap();
    let updated = service
        .update_post(alice.id, post.id, Some("  second  ".into()), None)
        .await
        .unwrap();
    assert_eq!(updated.content, "second");
}

#[tokio::test]
async fn delete_post_enforces_ownership() {
    let alice = seed_user("Alice");
    let bob = seed_user("Bob");
    let service = service_with(&[alice.clone(), bob.clone()]);

    let post = service.create_post(alice.id, "mine", None).await.unwrap();

    let err = service.delete_post(bob.id, post.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    service.delete_post(alice.id, post.id).await.unwrap();

    let err = service.get_post(post.id).await.unwrap_err();
    assert!(matches!(err, DomainError::PostNotFound(_)));
}

#[tokio::test]
async fn comment_requires_text() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let post = service.create_post(alice.id, "hello", None).await.unwrap();

    let err = service
        .add_comment(post.id, alice.id, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn comments_append_in_order_with_resolved_authors() {
    let alice = seed_user("Alice");
    let bob = seed_user("Bob");
    let service = service_with(&[alice.clone(), bob.clone()]);

    let post = service.create_post(alice.id, "hello", None).await.unwrap();
    service.add_comment(post.id, bob.id, "first!").await.unwrap();
    let detail = service
        .add_comment(post.id, alice.id, "thanks")
        .await
        .unwrap();

    assert_eq!(detail.comments.len(), 2);
    assert_eq!(detail.comments[0].text, "first!");
    assert_eq!(detail.comments[0].user.name, "Bob");
    assert_eq!(detail.comments[1].text, "thanks");
    assert_eq!(detail.comments[1].user.name, "Alice");
}

#[tokio::test]
async fn only_the_comment_author_may_delete_it() {
    let alice = seed_user("Alice");
    let bob = seed_user("Bob");
    let service = service_with(&[alice.clone(), bob.clone()]);

    // Alice owns the post, Bob owns the comment.
    let post = service.create_post(alice.id, "hello", None).await.unwrap();
    let detail = service.add_comment(post.id, bob.id, "hi").await.unwrap();
    let comment_id = detail.comments[0].id;

    let err = service
        .delete_comment(post.id, comment_id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let still_there = service.get_post(post.id).await.unwrap();
    assert_eq!(still_there.comments.len(), 1);

    let after = service
        .delete_comment(post.id, comment_id, bob.id)
        .await
        .unwrap();
    assert!(after.comments.is_empty());
}

#[tokio::test]
async fn deleting_missing_comment_is_not_found() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let post = service.create_post(alice.id, "hello", None).await.unwrap();
    let err = service
        .delete_comment(post.id, Uuid::new_v4(), alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CommentNotFound(_)));
}

#[tokio::test]
async fn list_returns_newest_first() {
    let alice = seed_user("Alice");
    let service = service_with(std::slice::from_ref(&alice));

    let first = service.create_post(alice.id, "one", None).await.unwrap();
    let second = service.create_post(alice.id, "two", None).await.unwrap();
    let third = service.create_post(alice.id, "three", None).await.unwrap();

    let posts = service.get_posts().await.unwrap();
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}
