/// Relationship aggregator: viewer-relative channel profile projections
/// derived from the subscription edge set.
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::subscription_repo;
use crate::error::{AppError, Result};
use crate::models::ChannelProfile;
use crate::validators;

/// Resolve a channel page for `username`, counting subscribers and followed
/// channels and deciding `is_subscribed` for the (optional) viewer. All
/// three quantities come from one statement over the edge set, so they are
/// mutually consistent even while subscriptions churn.
pub async fn get_channel_profile(
    pool: &PgPool,
    username: &str,
    viewer: Option<Uuid>,
) -> Result<ChannelProfile> {
    if validators::is_blank(username) {
        return Err(AppError::Validation(
            "channel username is required".to_string(),
        ));
    }

    subscription_repo::channel_profile(pool, username.trim(), viewer)
        .await?
        .ok_or_else(|| AppError::NotFound("channel does not exist".to_string()))
}
