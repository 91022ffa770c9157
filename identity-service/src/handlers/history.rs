/// Watch-history handler
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::{error::AppError, middleware::UserId, models::WatchedVideo, services::history};

/// GET /api/v1/users/me/history
#[utoipa::path(
    get,
    path = "/api/v1/users/me/history",
    tag = "Users",
    responses(
        (status = 200, description = "Ordered watch history with embedded owners", body = [WatchedVideo]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn get_watch_history(
    pool: web::Data<PgPool>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let watched = history::get_watch_history(pool.get_ref(), user.0).await?;
    Ok(HttpResponse::Ok().json(watched))
}
