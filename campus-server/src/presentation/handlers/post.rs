use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use tracing::info;
use uuid::Uuid;

use crate::application::post_service::PostService;
use crate::data::post_repository::PostgresPostRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::config::AppConfig;
use crate::presentation::dto::{CommentRequest, MessageResponse};
use crate::presentation::upload::read_post_form;
use crate::presentation::utils::{AuthenticatedUser, request_id};

#[post("/posts")]
pub async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> Result<HttpResponse, DomainError> {
    let form = read_post_form(payload, &config.upload_dir).await?;
    let post = service
        .create_post(user.id, form.content.as_deref().unwrap_or(""), form.image)
        .await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post.id,
        "post created"
    );

    Ok(HttpResponse::Created().json(post))
}

#[get("/posts")]
pub async fn get_posts(
    req: HttpRequest,
    service: web::Data<PostService<PostgresPostRepository>>,
) -> Result<HttpResponse, DomainError> {
    let posts = service.get_posts().await?;

    info!(request_id = %request_id(&req), total = posts.len(), "posts retrieved");

    Ok(HttpResponse::Ok().json(posts))
}

#[get("/posts/{id}")]
pub async fn get_post(
    service: web::Data<PostService<PostgresPostRepository>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post = service.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[put("/posts/{id}")]
pub async fn update_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let form = read_post_form(payload, &config.upload_dir).await?;
    let post = service
        .update_post(user.id, post_id, form.content, form.image)
        .await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post.id,
        "post updated"
    );

    Ok(HttpResponse::Ok().json(post))
}

#[delete("/posts/{id}")]
pub async fn delete_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    service.delete_post(user.id, post_id).await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post_id,
        "post deleted"
    );

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

#[post("/posts/{id}/like")]
pub async fn toggle_like(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = service.toggle_like(post_id, user.id).await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post_id,
        liked = post.likes.contains(&user.id),
        "like toggled"
    );

    Ok(HttpResponse::Ok().json(post))
}

#[post("/posts/{id}/comment")]
pub async fn add_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    path: web::Path<Uuid>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = service.add_comment(post_id, user.id, &payload.text).await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post_id,
        "comment added"
    );

    Ok(HttpResponse::Ok().json(post))
}

#[delete("/posts/{id}/comment/{comment_id}")]
pub async fn delete_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService<PostgresPostRepository>>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, DomainError> {
    let (post_id, comment_id) = path.into_inner();
    let post = service.delete_comment(post_id, comment_id, user.id).await?;

    info!(
        request_id = %request_id(&req),
        user = %user.name,
        post_id = %post_id,
        comment_id = %comment_id,
        "comment deleted"
    );

    Ok(HttpResponse::Ok().json(post))
}
