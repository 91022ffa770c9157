/// Authentication handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    config::Config,
    error::AppError,
    middleware::UserId,
    models::{TokenPair, UserProfile},
    services::{
        media_store::MediaStore,
        session::{self, LoginInput, NewAccount},
    },
};
use sqlx::PgPool;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    /// Staged avatar reference to resolve through the media store (required)
    pub avatar: String,
    /// Optional staged cover image reference
    pub cover_image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserProfile),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or username taken")
    )
)]
pub async fn register(
    pool: web::Data<PgPool>,
    media: web::Data<Arc<dyn MediaStore>>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();

    let profile = session::register(
        pool.get_ref(),
        media.get_ref(),
        NewAccount {
            fullname: payload.fullname,
            email: payload.email,
            username: payload.username,
            password: payload.password,
            avatar_source: payload.avatar,
            cover_source: payload.cover_image,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(profile))
}

/// Login endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "User not found")
    )
)]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();

    let (user, pair) = session::login(
        pool.get_ref(),
        &config.jwt,
        LoginInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Refresh token endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPair),
        (status = 401, description = "Missing, invalid or already-rotated token")
    )
)]
pub async fn refresh_token(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let pair = session::refresh(
        pool.get_ref(),
        &config.jwt,
        payload.refresh_token.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// Logout endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "User logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(pool: web::Data<PgPool>, user: UserId) -> Result<HttpResponse, AppError> {
    session::logout(pool.get_ref(), user.0).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

/// Change password endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Old password incorrect")
    )
)]
pub async fn change_password(
    pool: web::Data<PgPool>,
    user: UserId,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    session::change_password(
        pool.get_ref(),
        user.0,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
