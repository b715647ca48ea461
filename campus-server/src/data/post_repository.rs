use std::collections::HashMap;

use crate::domain::error::DomainError;
use crate::domain::post::{Author, Comment, CommentAuthor, CommentDetail, Post, PostDetail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<(), DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    /// The post with owner, likers and comment authors resolved.
    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, DomainError>;
    /// All posts, newest first, resolved.
    async fn list_details(&self) -> Result<Vec<PostDetail>, DomainError>;
    /// Applies supplied fields only; conditional on ownership. Returns false
    /// when no row matched.
    async fn update_post(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: Option<String>,
        image: Option<String>,
    ) -> Result<bool, DomainError>;
    async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), DomainError>;
    /// Returns true if the like was newly added.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;
    /// Returns true if a like was removed.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;
    async fn add_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), DomainError>;
    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DomainError>;
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<PostDetailRow>) -> Result<Vec<PostDetail>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let likes = sqlx::query_as::<_, LikeRow>(
            r#"
            SELECT post_id, user_id
            FROM post_likes
            WHERE post_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching likes: {}", e);
            DomainError::Internal(e.to_string())
        })?;

        let comments = sqlx::query_as::<_, CommentDetailRow>(
            r#"
            SELECT c.id, c.post_id, c.text, c.created_at,
                   u.id AS user_id, u.name AS user_name, u.avatar AS user_avatar
            FROM post_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching comments: {}", e);
            DomainError::Internal(e.to_string())
        })?;

        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for like in likes {
            likes_by_post.entry(like.post_id).or_default().push(like.user_id);
        }

        let mut comments_by_post: HashMap<Uuid, Vec<CommentDetail>> = HashMap::new();
        for row in comments {
            let post_id = row.post_id;
            comments_by_post
                .entry(post_id)
                .or_default()
                .push(row.into_detail());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let likes = likes_by_post.remove(&row.id).unwrap_or_default();
                let comments = comments_by_post.remove(&row.id).unwrap_or_default();
                row.into_detail(likes, comments)
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, content, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create post: {}", e);
            DomainError::Internal(format!("database error: {}", e))
        })?;

        info!(post_id = %post.id, user_id = %post.user_id, "post created");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, content, image, created_at, updated_at
            FROM posts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find_by_id {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, DomainError> {
        let row = sqlx::query_as::<_, PostDetailRow>(
            r#"
            SELECT p.id, p.content, p.image, p.created_at, p.updated_at,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email,
                   u.avatar AS user_avatar
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find_detail {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn list_details(&self) -> Result<Vec<PostDetail>, DomainError> {
        let rows = sqlx::query_as::<_, PostDetailRow>(
            r#"
            SELECT p.id, p.content, p.image, p.created_at, p.updated_at,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email,
                   u.avatar AS user_avatar
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching posts: {}", e);
            DomainError::Internal(e.to_string())
        })?;

        self.hydrate(rows).await
    }

    async fn update_post(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: Option<String>,
        image: Option<String>,
    ) -> Result<bool, DomainError> {
        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET
                content = COALESCE($1, content),
                image = COALESCE($2, image),
                updated_at = $3
            WHERE id = $4 AND user_id = $5
            "#,
        )
        .bind(content)
        .bind(image)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update post {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        if updated.rows_affected() > 0 {
            info!(post_id = %id, "post updated");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| DomainError::Internal(e.to_string()))?;

            return if exists {
                Err(DomainError::Forbidden("not authorized to delete this post"))
            } else {
                Err(DomainError::PostNotFound(id))
            };
        }

        info!(post_id = %id, "post deleted");
        Ok(())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e, "post_likes_post_id_fkey") {
                DomainError::PostNotFound(post_id)
            } else {
                error!("failed to like post {}: {}", post_id, e);
                DomainError::Internal(e.to_string())
            }
        })?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        Ok(removed.rows_affected() > 0)
    }

    async fn add_comment(&self, post_id: Uuid, comment: Comment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO post_comments (id, post_id, user_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(comment.id)
        .bind(post_id)
        .bind(comment.user_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e, "post_comments_post_id_fkey") {
                DomainError::PostNotFound(post_id)
            } else {
                error!("failed to comment on post {}: {}", post_id, e);
                DomainError::Internal(e.to_string())
            }
        })?;

        info!(post_id = %post_id, comment_id = %comment.id, "comment added");
        Ok(())
    }

    async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DomainError> {
        let deleted = sqlx::query(
            "DELETE FROM post_comments WHERE id = $1 AND post_id = $2 AND user_id = $3",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            // The delete is conditional on authorship, so a miss needs a
            // probe to tell Forbidden apart from NotFound.
            let comment_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM post_comments WHERE id = $1 AND post_id = $2)",
            )
            .bind(comment_id)
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

            if comment_exists {
                return Err(DomainError::Forbidden(
                    "not authorized to delete this comment",
                ));
            }

            let post_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(post_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| DomainError::Internal(e.to_string()))?;

            return if post_exists {
                Err(DomainError::CommentNotFound(comment_id))
            } else {
                Err(DomainError::PostNotFound(post_id))
            };
        }

        info!(post_id = %post_id, comment_id = %comment_id, "comment deleted");
        Ok(())
    }
}

fn is_fk_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c == constraint)
        == Some(true)
}

#[derive(sqlx::FromRow)]
struct PostDetailRow {
    id: Uuid,
    content: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    user_avatar: Option<String>,
}

impl PostDetailRow {
    fn into_detail(self, likes: Vec<Uuid>, comments: Vec<CommentDetail>) -> PostDetail {
        PostDetail {
            id: self.id,
            user: Author {
                id: self.user_id,
                name: self.user_name,
                email: self.user_email,
                avatar: self.user_avatar,
            },
            content: self.content,
            image: self.image,
            likes,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LikeRow {
    post_id: Uuid,
    user_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct CommentDetailRow {
    id: Uuid,
    post_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_avatar: Option<String>,
}

impl CommentDetailRow {
    fn into_detail(self) -> CommentDetail {
        CommentDetail {
            id: self.id,
            user: CommentAuthor {
                id: self.user_id,
                name: self.user_name,
                avatar: self.user_avatar,
            },
            text: self.text,
            created_at: self.created_at,
        }
    }
}
