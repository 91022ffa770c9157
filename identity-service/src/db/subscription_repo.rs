/// Subscription edge repository (read-only: edges are written out-of-core)
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::ChannelProfile;

/// Channel profile aggregate, computed in one statement so the two counts
/// and the membership flag come from the same snapshot of the edge set.
/// `viewer` is the optional authenticated caller; a NULL viewer can never
/// match an edge, so `is_subscribed` is false for anonymous requests.
pub async fn channel_profile(
    pool: &PgPool,
    username: &str,
    viewer: Option<Uuid>,
) -> Result<Option<ChannelProfile>> {
    let profile = sqlx::query_as::<_, ChannelProfile>(
        r#"
        SELECT u.fullname,
               u.username,
               u.email,
               u.avatar_url,
               u.cover_url,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscribers_count,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) AS following_count,
               EXISTS(
                   SELECT 1 FROM subscriptions s
                   WHERE s.channel_id = u.id AND s.subscriber_id = $2
               ) AS is_subscribed
        FROM users u
        WHERE u.username = $1
        "#,
    )
    .bind(username.to_lowercase())
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to aggregate channel profile: {}", e);
        AppError::Database(e)
    })?;

    Ok(profile)
}

/// Check whether `subscriber_id` follows `channel_id`
pub async fn is_subscribed(
    pool: &PgPool,
    subscriber_id: Uuid,
    channel_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2)",
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to check subscription status: {}", e);
        AppError::Database(e)
    })?;

    Ok(result.get::<bool, _>(0))
}

/// Number of subscribers a channel has
pub async fn subscribers_count(pool: &PgPool, channel_id: Uuid) -> Result<i64> {
    let result = sqlx::query("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
        .bind(channel_id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get subscribers count: {}", e);
            AppError::Database(e)
        })?;

    Ok(result.get::<i64, _>(0))
}

/// Number of channels a user follows
pub async fn following_count(pool: &PgPool, subscriber_id: Uuid) -> Result<i64> {
    let result = sqlx::query("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
        .bind(subscriber_id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get following count: {}", e);
            AppError::Database(e)
        })?;

    Ok(result.get::<i64, _>(0))
}
