/// Channel profile handler
use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    middleware::viewer_from_request,
    models::ChannelProfile,
    services::channel,
};

/// GET /api/v1/channels/{username}
///
/// Public endpoint. A valid Bearer token makes `is_subscribed` viewer-
/// relative; an absent or invalid token degrades to an anonymous view.
#[utoipa::path(
    get,
    path = "/api/v1/channels/{username}",
    tag = "Channels",
    params(("username" = String, Path, description = "Channel username")),
    responses(
        (status = 200, description = "Channel profile", body = ChannelProfile),
        (status = 400, description = "Blank username"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn get_channel_profile(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    let viewer = viewer_from_request(&req);

    let profile = channel::get_channel_profile(pool.get_ref(), &username, viewer).await?;
    Ok(HttpResponse::Ok().json(profile))
}
