use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::data::user_repository::PostgresUserRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::security::TOKEN_TTL_HOURS;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::presentation::utils::{AuthenticatedUser, request_id};

#[post("/auth/register")]
pub async fn register(
    req: HttpRequest,
    service: web::Data<AuthService<PostgresUserRepository>>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, DomainError> {
    let payload = payload.into_inner();
    if payload.name.trim().is_empty() {
        return Err(DomainError::Validation("name is required".to_string()));
    }

    let user = service
        .register(payload.name, payload.email, payload.password.clone())
        .await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        email = %user.email,
        "user registered"
    );

    let jwt = service.login(&user.email, &payload.password).await?;

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token: jwt,
        expires_in: TOKEN_TTL_HOURS * 3600,
        token_type: "Bearer".to_string(),
    }))
}

#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    service: web::Data<AuthService<PostgresUserRepository>>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, DomainError> {
    let jwt = service.login(&payload.email, &payload.password).await?;

    info!(request_id = %request_id(&req), email = %payload.email, "user logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: jwt,
        expires_in: TOKEN_TTL_HOURS * 3600,
        token_type: "Bearer".to_string(),
    }))
}

#[get("/auth/me")]
pub async fn me(
    user: AuthenticatedUser,
    service: web::Data<AuthService<PostgresUserRepository>>,
) -> Result<impl Responder, DomainError> {
    let user = service.get_user(user.id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
