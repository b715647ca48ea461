use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(user_id: Uuid, content: &str, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            content: content.trim().to_string(),
            image,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_substance(content: &str, image: Option<&str>) -> bool {
        !content.trim().is_empty() || image.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: Uuid, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            text: text.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A post's owner resolved to display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// A comment's author resolved to display fields (no email).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDetail {
    pub id: Uuid,
    pub user: CommentAuthor,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The aggregate as callers see it: the post with its owner and every
/// comment author resolved, likes as liker ids, comments in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub user: Author,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
