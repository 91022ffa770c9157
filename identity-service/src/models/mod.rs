use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Full user record as stored. Never serialized outward; callers go through
/// [`UserProfile`] so the credential fields cannot leak.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub refresh_token: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Video record. Read-only from this service's perspective.
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: i32,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

/// Outward user projection. The whitelist is structural: password hash and
/// refresh token are not fields of this type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar_url: user.avatar_url,
            cover_url: user.cover_url,
            created_at: user.created_at,
        }
    }
}

/// Channel page projection derived from the subscription edge set.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ChannelProfile {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub subscribers_count: i64,
    pub following_count: i64,
    pub is_subscribed: bool,
}

/// Owner projection embedded in watch-history entries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VideoOwner {
    pub fullname: String,
    pub username: String,
    pub avatar_url: String,
}

/// One resolved watch-history entry. `owner` is absent when the owning
/// account no longer exists.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WatchedVideo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: i32,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner: Option<VideoOwner>,
}

/// Access/refresh credential pair. Values are opaque to the transport layer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            fullname: "Alice Example".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            avatar_url: "https://cdn.vidra.app/a.png".to_string(),
            cover_url: None,
            refresh_token: Some("some.refresh.token".to_string()),
            watch_history: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_projection_never_carries_credentials() {
        let profile: UserProfile = sample_user().into();
        let json = serde_json::to_value(&profile).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        assert!(keys.contains(&"username"));
        assert!(keys.contains(&"email"));
        assert!(!keys.contains(&"password_hash"));
        assert!(!keys.contains(&"refresh_token"));
    }

    #[test]
    fn test_channel_profile_serializes_counts_and_flag() {
        let channel = ChannelProfile {
            fullname: "Alice Example".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: "https://cdn.vidra.app/a.png".to_string(),
            cover_url: None,
            subscribers_count: 3,
            following_count: 1,
            is_subscribed: true,
        };
        let json = serde_json::to_value(&channel).unwrap();
        assert_eq!(json["subscribers_count"], 3);
        assert_eq!(json["following_count"], 1);
        assert_eq!(json["is_subscribed"], true);
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
    }

    #[test]
    fn test_watched_video_owner_is_optional() {
        let video = WatchedVideo {
            id: Uuid::new_v4(),
            title: "orphaned upload".to_string(),
            description: None,
            video_url: "https://cdn.vidra.app/v.mp4".to_string(),
            thumbnail_url: "https://cdn.vidra.app/t.jpg".to_string(),
            duration_seconds: 42,
            views: 0,
            created_at: Utc::now(),
            owner: None,
        };
        let json = serde_json::to_value(&video).unwrap();
        assert!(json["owner"].is_null());
    }
}
