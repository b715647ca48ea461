use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ClientError;
use crate::{Post, UserProfile};

/// An image attachment for create/update, sent as a multipart part.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

/// Thin 1:1 wrapper over the REST surface. The bearer token is explicit
/// state handed in by the caller; the gateway never reaches into ambient
/// storage. No retries, no caching.
#[derive(Clone)]
pub struct CampusApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl CampusApi {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Attaches the bearer credential when one is configured; public
    /// endpoints get it too, the server just ignores it there.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(ClientError::from_http_response(resp).await)
        }
    }

    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let auth: AuthResponse = Self::expect_json(resp).await?;
        self.set_token(Some(auth.access_token));
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let auth: AuthResponse = Self::expect_json(resp).await?;
        self.set_token(Some(auth.access_token));
        Ok(())
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let resp = self
            .authorize(self.client.get(self.url("/auth/me")))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        let resp = self
            .authorize(self.client.get(self.url("/posts")))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, ClientError> {
        let resp = self
            .authorize(self.client.get(self.url(&format!("/posts/{}", id))))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn create_post(
        &self,
        content: Option<&str>,
        image: Option<ImageUpload>,
    ) -> Result<Post, ClientError> {
        let form = post_form(content, image)?;
        let resp = self
            .authorize(self.client.post(self.url("/posts")))
            .multipart(form)
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        content: Option<&str>,
        image: Option<ImageUpload>,
    ) -> Result<Post, ClientError> {
        let form = post_form(content, image)?;
        let resp = self
            .authorize(self.client.put(self.url(&format!("/posts/{}", id))))
            .multipart(form)
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<String, ClientError> {
        let resp = self
            .authorize(self.client.delete(self.url(&format!("/posts/{}", id))))
            .send()
            .await?;
        let body: MessageResponse = Self::expect_json(resp).await?;
        Ok(body.message)
    }

    pub async fn toggle_like(&self, id: Uuid) -> Result<Post, ClientError> {
        let resp = self
            .authorize(self.client.post(self.url(&format!("/posts/{}/like", id))))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn add_comment(&self, id: Uuid, text: &str) -> Result<Post, ClientError> {
        let resp = self
            .authorize(
                self.client
                    .post(self.url(&format!("/posts/{}/comment", id))),
            )
            .json(&json!({ "text": text }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    pub async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Post, ClientError> {
        let resp = self
            .authorize(
                self.client
                    .delete(self.url(&format!("/posts/{}/comment/{}", post_id, comment_id))),
            )
            .send()
            .await?;
        Self::expect_json(resp).await
    }
}

fn post_form(content: Option<&str>, image: Option<ImageUpload>) -> Result<Form, ClientError> {
    let mut form = Form::new();
    if let Some(content) = content {
        form = form.text("content", content.to_string());
    }
    if let Some(image) = image {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        form = form.part("image", part);
    }
    Ok(form)
}
