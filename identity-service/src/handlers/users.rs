/// Current-user profile handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    middleware::UserId,
    models::UserProfile,
    services::{media_store::MediaStore, session},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub fullname: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAvatarRequest {
    /// Staged avatar reference to resolve through the media store
    pub avatar: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCoverRequest {
    /// Staged cover image reference to resolve through the media store
    pub cover_image: String,
}

/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current session user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    pool: web::Data<PgPool>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let profile = session::current_user(pool.get_ref(), user.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/users/me
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "Users",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = UserProfile),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn update_account(
    pool: web::Data<PgPool>,
    user: UserId,
    payload: web::Json<UpdateAccountRequest>,
) -> Result<HttpResponse, AppError> {
    let profile =
        session::update_account(pool.get_ref(), user.0, &payload.fullname, &payload.email).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/users/me/avatar
#[utoipa::path(
    patch,
    path = "/api/v1/users/me/avatar",
    tag = "Users",
    request_body = UpdateAvatarRequest,
    responses(
        (status = 200, description = "Avatar replaced", body = UserProfile),
        (status = 400, description = "Missing avatar reference"),
        (status = 502, description = "Media store failure")
    )
)]
pub async fn update_avatar(
    pool: web::Data<PgPool>,
    media: web::Data<Arc<dyn MediaStore>>,
    user: UserId,
    payload: web::Json<UpdateAvatarRequest>,
) -> Result<HttpResponse, AppError> {
    let profile =
        session::update_avatar(pool.get_ref(), media.get_ref(), user.0, &payload.avatar).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/users/me/cover
#[utoipa::path(
    patch,
    path = "/api/v1/users/me/cover",
    tag = "Users",
    request_body = UpdateCoverRequest,
    responses(
        (status = 200, description = "Cover image replaced", body = UserProfile),
        (status = 400, description = "Missing cover reference"),
        (status = 502, description = "Media store failure")
    )
)]
pub async fn update_cover(
    pool: web::Data<PgPool>,
    media: web::Data<Arc<dyn MediaStore>>,
    user: UserId,
    payload: web::Json<UpdateCoverRequest>,
) -> Result<HttpResponse, AppError> {
    let profile =
        session::update_cover(pool.get_ref(), media.get_ref(), user.0, &payload.cover_image)
            .await?;
    Ok(HttpResponse::Ok().json(profile))
}
