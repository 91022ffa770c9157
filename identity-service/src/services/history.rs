/// History joiner: resolves a user's ordered watch-history ids into joined
/// video + owner projections.
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{user_repo, video_repo};
use crate::error::{AppError, Result};
use crate::models::WatchedVideo;

/// Load the requesting user's watch history, order and duplicates
/// preserved. Only a missing user is an error; ids that no longer resolve
/// are dropped and a vanished owner is embedded as `None`.
pub async fn get_watch_history(pool: &PgPool, user_id: Uuid) -> Result<Vec<WatchedVideo>> {
    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    let watched = video_repo::resolve_watch_history(pool, &user.watch_history).await?;
    Ok(watched)
}
