use std::sync::Arc;

use crate::data::post_repository::PostRepository;
use crate::domain::{
    error::DomainError,
    post::{Comment, Post, PostDetail},
};
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct PostService<R: PostRepository + 'static> {
    repo: Arc<R>,
}

impl<R> PostService<R>
where
    R: PostRepository + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get_post(&self, id: Uuid) -> Result<PostDetail, DomainError> {
        self.repo
            .find_detail(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))
    }

    pub async fn get_posts(&self) -> Result<Vec<PostDetail>, DomainError> {
        self.repo.list_details().await
    }

    #[instrument(skip(self, content))]
    pub async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        image: Option<String>,
    ) -> Result<PostDetail, DomainError> {
        if !Post::has_substance(content, image.as_deref()) {
            return Err(DomainError::Validation(
                "post must have content or an image".to_string(),
            ));
        }

        let post = Post::new(user_id, content, image);
        let id = post.id;
        self.repo.create(post).await?;
        self.resolved(id).await
    }

    /// Both fields are replaced only when supplied. The content-or-image
    /// invariant is re-checked against the post as it would look after the
    /// edit, so an update cannot strip a post down to nothing.
    #[instrument(skip(self, content, image))]
    pub async fn update_post(
        &self,
        requester: Uuid,
        post_id: Uuid,
        content: Option<String>,
        image: Option<String>,
    ) -> Result<PostDetail, DomainError> {
        let current = self
            .repo
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))?;

        if current.user_id != requester {
            return Err(DomainError::Forbidden("not authorized to update this post"));
        }

        let content = content.map(|c| c.trim().to_string());
        let next_content = content.as_deref().unwrap_or(&current.content);
        let next_image = image.as_deref().or(current.image.as_deref());
        if !Post::has_substance(next_content, next_image) {
            return Err(DomainError::Validation(
                "post must have content or an image".to_string(),
            ));
        }

        if !self
            .repo
            .update_post(post_id, requester, content, image)
            .await?
        {
            return Err(DomainError::PostNotFound(post_id));
        }

        self.resolved(post_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, requester: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_post(post_id, requester).await
    }

    /// Removes the user from the liker set if present, adds them otherwise.
    #[instrument(skip(self))]
    pub async fn toggle_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<PostDetail, DomainError> {
        if self.repo.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::PostNotFound(post_id));
        }

        if !self.repo.remove_like(post_id, user_id).await? {
            self.repo.add_like(post_id, user_id).await?;
        }

        self.resolved(post_id).await
    }

    #[instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<PostDetail, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::Validation(
                "comment text is required".to_string(),
            ));
        }

        let comment = Comment::new(user_id, text);
        self.repo.add_comment(post_id, comment).await?;
        self.resolved(post_id).await
    }

    /// Only the comment's own author may remove it; post ownership grants
    /// no power over other users' comments.
    #[instrument(skip(self))]
    pub async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        requester: Uuid,
    ) -> Result<PostDetail, DomainError> {
        self.repo
            .delete_comment(post_id, comment_id, requester)
            .await?;
        self.resolved(post_id).await
    }

    async fn resolved(&self, id: Uuid) -> Result<PostDetail, DomainError> {
        self.repo
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("post {} missing after write", id)))
    }
}
