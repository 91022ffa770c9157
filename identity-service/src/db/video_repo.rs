/// Video repository - read side of the watch-history join
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{Video, VideoOwner, WatchedVideo};

#[derive(Debug, FromRow)]
struct WatchHistoryRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    video_url: String,
    thumbnail_url: String,
    duration_seconds: i32,
    views: i64,
    created_at: DateTime<Utc>,
    owner_fullname: Option<String>,
    owner_username: Option<String>,
    owner_avatar_url: Option<String>,
}

impl From<WatchHistoryRow> for WatchedVideo {
    fn from(row: WatchHistoryRow) -> Self {
        // All three owner columns come from the same LEFT JOIN row; username
        // present means the owner record still exists.
        let owner = match (row.owner_fullname, row.owner_username, row.owner_avatar_url) {
            (Some(fullname), Some(username), Some(avatar_url)) => Some(VideoOwner {
                fullname,
                username,
                avatar_url,
            }),
            _ => None,
        };

        WatchedVideo {
            id: row.id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            duration_seconds: row.duration_seconds,
            views: row.views,
            created_at: row.created_at,
            owner,
        }
    }
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(
        r#"
        SELECT id, owner_id, title, description, video_url, thumbnail_url,
               duration_seconds, views, created_at
        FROM videos WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Resolve an ordered watch-history id sequence into joined video+owner
/// projections.
///
/// `unnest ... WITH ORDINALITY` keeps the caller's order and duplicate
/// entries; ids whose video no longer exists simply drop out of the inner
/// join, and a vanished owner surfaces as NULL owner columns rather than
/// losing the row.
pub async fn resolve_watch_history(
    pool: &PgPool,
    history: &[Uuid],
) -> Result<Vec<WatchedVideo>, sqlx::Error> {
    if history.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, WatchHistoryRow>(
        r#"
        SELECT v.id, v.title, v.description, v.video_url, v.thumbnail_url,
               v.duration_seconds, v.views, v.created_at,
               o.fullname   AS owner_fullname,
               o.username   AS owner_username,
               o.avatar_url AS owner_avatar_url
        FROM unnest($1::uuid[]) WITH ORDINALITY AS h(video_id, ord)
        JOIN videos v ON v.id = h.video_id
        LEFT JOIN users o ON o.id = v.owner_id
        ORDER BY h.ord
        "#,
    )
    .bind(history)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WatchedVideo::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_owner_columns_builds_embedded_owner() {
        let row = WatchHistoryRow {
            id: Uuid::new_v4(),
            title: "tour vlog".to_string(),
            description: Some("day one".to_string()),
            video_url: "https://cdn.vidra.app/v.mp4".to_string(),
            thumbnail_url: "https://cdn.vidra.app/t.jpg".to_string(),
            duration_seconds: 300,
            views: 12,
            created_at: Utc::now(),
            owner_fullname: Some("Alice Example".to_string()),
            owner_username: Some("alice".to_string()),
            owner_avatar_url: Some("https://cdn.vidra.app/a.png".to_string()),
        };

        let video: WatchedVideo = row.into();
        let owner = video.owner.expect("owner should be present");
        assert_eq!(owner.username, "alice");
    }

    #[test]
    fn test_row_without_owner_yields_absent_owner() {
        let row = WatchHistoryRow {
            id: Uuid::new_v4(),
            title: "orphaned".to_string(),
            description: None,
            video_url: "https://cdn.vidra.app/v.mp4".to_string(),
            thumbnail_url: "https://cdn.vidra.app/t.jpg".to_string(),
            duration_seconds: 60,
            views: 0,
            created_at: Utc::now(),
            owner_fullname: None,
            owner_username: None,
            owner_avatar_url: None,
        };

        let video: WatchedVideo = row.into();
        assert!(video.owner.is_none());
    }
}
