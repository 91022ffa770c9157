//! End-to-end scenario tests against a live PostgreSQL.
//!
//! Gated behind the `live-db-tests` feature; set DATABASE_URL to a disposable
//! database before running:
//!
//!   DATABASE_URL=postgres://localhost/vidra_identity_test \
//!     cargo test -p identity-service --features live-db-tests

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use identity_service::config::JwtConfig;
use identity_service::db::{create_pool, run_migrations, subscription_repo, user_repo, video_repo};
use identity_service::error::AppError;
use identity_service::security::jwt;
use identity_service::services::channel;
use identity_service::services::history;
use identity_service::services::media_store::MediaStore;
use identity_service::services::session::{self, LoginInput, NewAccount};

struct StubMediaStore;

#[async_trait]
impl MediaStore for StubMediaStore {
    async fn upload(&self, local_ref: &str) -> Result<String, AppError> {
        Ok(format!("https://cdn.test/uploads/{}-{}", Uuid::new_v4(), local_ref.len()))
    }

    async fn delete(&self, _remote_ref: &str) -> Result<(), AppError> {
        Ok(())
    }
}

fn media() -> Arc<dyn MediaStore> {
    Arc::new(StubMediaStore)
}

fn jwt_cfg() -> JwtConfig {
    JwtConfig {
        secret: "live-test-secret".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 864000,
    }
}

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = create_pool(&url, 5).await.expect("connect");
    run_migrations(&pool).await.expect("migrate");
    jwt::initialize_secret("live-test-secret").expect("init secret");
    pool
}

fn unique(prefix: &str) -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &tag[..12])
}

async fn register_user(pool: &PgPool, username: &str) -> identity_service::models::UserProfile {
    session::register(
        pool,
        &media(),
        NewAccount {
            fullname: format!("{} Fullname", username),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            password: "SecurePass123!".to_string(),
            avatar_source: "/tmp/avatar.png".to_string(),
            cover_source: None,
        },
    )
    .await
    .expect("register")
}

async fn stored_refresh_token(pool: &PgPool, user_id: Uuid) -> Option<String> {
    user_repo::find_by_id(pool, user_id)
        .await
        .expect("find user")
        .expect("user exists")
        .refresh_token
}

async fn insert_video(pool: &PgPool, owner_id: Option<Uuid>, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO videos (id, owner_id, title, video_url, thumbnail_url, duration_seconds)
        VALUES ($1, $2, $3, 'https://cdn.test/v.mp4', 'https://cdn.test/t.jpg', 60)
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(title)
    .execute(pool)
    .await
    .expect("insert video");
    id
}

async fn subscribe(pool: &PgPool, subscriber_id: Uuid, channel_id: Uuid) {
    sqlx::query("INSERT INTO subscriptions (subscriber_id, channel_id) VALUES ($1, $2)")
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(pool)
        .await
        .expect("insert subscription");
}

#[tokio::test]
async fn test_registration_returns_projection_and_rejects_duplicates() {
    let pool = setup().await;
    let username = unique("reg");

    let profile = register_user(&pool, &username).await;
    assert_eq!(profile.username, username);
    assert!(profile.avatar_url.starts_with("https://cdn.test/uploads/"));

    // Same email or username again: conflict, and no orphan record
    let dup = session::register(
        &pool,
        &media(),
        NewAccount {
            fullname: "Someone Else".to_string(),
            email: format!("{}@example.com", username),
            username: unique("other"),
            password: "SecurePass123!".to_string(),
            avatar_source: "/tmp/avatar.png".to_string(),
            cover_source: None,
        },
    )
    .await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_login_persists_the_returned_refresh_token() {
    let pool = setup().await;
    let username = unique("login");
    let profile = register_user(&pool, &username).await;

    // Wrong password first
    let wrong = session::login(
        &pool,
        &jwt_cfg(),
        LoginInput {
            username: Some(username.clone()),
            email: None,
            password: "WrongPass123!".to_string(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Authentication(_))));
    assert_eq!(stored_refresh_token(&pool, profile.id).await, None);

    // Correct password: stored token equals the returned one
    let (user, pair) = session::login(
        &pool,
        &jwt_cfg(),
        LoginInput {
            username: Some(username.clone()),
            email: None,
            password: "SecurePass123!".to_string(),
        },
    )
    .await
    .expect("login");
    assert_eq!(user.id, profile.id);
    assert_eq!(
        stored_refresh_token(&pool, profile.id).await.as_deref(),
        Some(pair.refresh_token.as_str())
    );

    // Login by email works too and rotates the stored value
    let (_, pair2) = session::login(
        &pool,
        &jwt_cfg(),
        LoginInput {
            username: None,
            email: Some(format!("{}@example.com", username)),
            password: "SecurePass123!".to_string(),
        },
    )
    .await
    .expect("login by email");
    assert_ne!(pair.refresh_token, pair2.refresh_token);

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_refresh_rotation_is_single_use() {
    let pool = setup().await;
    let username = unique("rot");
    let profile = register_user(&pool, &username).await;

    let pair = session::issue_token_pair(&pool, &jwt_cfg(), profile.id, None)
        .await
        .expect("issue");

    let rotated = session::refresh(&pool, &jwt_cfg(), Some(&pair.refresh_token))
        .await
        .expect("first refresh succeeds");
    assert_ne!(rotated.refresh_token, pair.refresh_token);
    assert_eq!(
        stored_refresh_token(&pool, profile.id).await.as_deref(),
        Some(rotated.refresh_token.as_str())
    );

    // Re-presenting the rotated-away token always fails
    let replay = session::refresh(&pool, &jwt_cfg(), Some(&pair.refresh_token)).await;
    assert!(matches!(replay, Err(AppError::Authentication(_))));

    // The canonical token still works afterwards
    session::refresh(&pool, &jwt_cfg(), Some(&rotated.refresh_token))
        .await
        .expect("canonical token refreshes");

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_concurrent_refresh_has_exactly_one_winner() {
    let pool = setup().await;
    let username = unique("race");
    let profile = register_user(&pool, &username).await;

    let pair = session::issue_token_pair(&pool, &jwt_cfg(), profile.id, None)
        .await
        .expect("issue");

    let cfg = jwt_cfg();
    let (a, b) = tokio::join!(
        session::refresh(&pool, &cfg, Some(&pair.refresh_token)),
        session::refresh(&pool, &cfg, Some(&pair.refresh_token)),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one racing refresh may win");

    let canonical = if let Ok(p) = a { p } else { b.expect("one winner") };
    assert_eq!(
        stored_refresh_token(&pool, profile.id).await.as_deref(),
        Some(canonical.refresh_token.as_str())
    );

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_logout_clears_session_and_is_idempotent() {
    let pool = setup().await;
    let username = unique("out");
    let profile = register_user(&pool, &username).await;

    let pair = session::issue_token_pair(&pool, &jwt_cfg(), profile.id, None)
        .await
        .expect("issue");

    session::logout(&pool, profile.id).await.expect("logout");
    session::logout(&pool, profile.id).await.expect("logout twice");
    assert_eq!(stored_refresh_token(&pool, profile.id).await, None);

    // A pre-logout refresh token is dead
    let replay = session::refresh(&pool, &jwt_cfg(), Some(&pair.refresh_token)).await;
    assert!(matches!(replay, Err(AppError::Authentication(_))));

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_change_password_requires_old_password() {
    let pool = setup().await;
    let username = unique("pw");
    let profile = register_user(&pool, &username).await;

    let bad = session::change_password(&pool, profile.id, "WrongPass123!", "NewSecure456!").await;
    assert!(matches!(bad, Err(AppError::Authentication(_))));

    session::change_password(&pool, profile.id, "SecurePass123!", "NewSecure456!")
        .await
        .expect("change password");

    session::login(
        &pool,
        &jwt_cfg(),
        LoginInput {
            username: Some(username.clone()),
            email: None,
            password: "NewSecure456!".to_string(),
        },
    )
    .await
    .expect("login with new password");

    user_repo::delete_user(&pool, profile.id).await.expect("cleanup");
}

#[tokio::test]
async fn test_channel_profile_counts_and_viewer_flag() {
    let pool = setup().await;
    let alice = register_user(&pool, &unique("alice")).await;
    let bob = register_user(&pool, &unique("bob")).await;
    let carol = register_user(&pool, &unique("carol")).await;

    subscribe(&pool, bob.id, alice.id).await;

    let seen_by_bob = channel::get_channel_profile(&pool, &alice.username, Some(bob.id))
        .await
        .expect("profile for bob");
    assert_eq!(seen_by_bob.subscribers_count, 1);
    assert_eq!(seen_by_bob.following_count, 0);
    assert!(seen_by_bob.is_subscribed);

    let seen_by_carol = channel::get_channel_profile(&pool, &alice.username, Some(carol.id))
        .await
        .expect("profile for carol");
    assert_eq!(seen_by_carol.subscribers_count, 1);
    assert!(!seen_by_carol.is_subscribed);

    let anonymous = channel::get_channel_profile(&pool, &alice.username, None)
        .await
        .expect("anonymous profile");
    assert!(!anonymous.is_subscribed);

    // Repo helpers agree with the one-statement aggregate
    assert_eq!(subscription_repo::subscribers_count(&pool, alice.id).await.unwrap(), 1);
    assert_eq!(subscription_repo::following_count(&pool, bob.id).await.unwrap(), 1);
    assert!(subscription_repo::is_subscribed(&pool, bob.id, alice.id).await.unwrap());
    assert!(!subscription_repo::is_subscribed(&pool, carol.id, alice.id).await.unwrap());

    let missing = channel::get_channel_profile(&pool, &unique("ghost"), None).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    for user in [carol, bob, alice] {
        user_repo::delete_user(&pool, user.id).await.expect("cleanup");
    }
}

#[tokio::test]
async fn test_watch_history_preserves_order_duplicates_and_absent_owners() {
    let pool = setup().await;
    let viewer = register_user(&pool, &unique("viewer")).await;
    let creator = register_user(&pool, &unique("maker")).await;
    let doomed = register_user(&pool, &unique("doomed")).await;

    let v1 = insert_video(&pool, Some(creator.id), "first").await;
    let v2 = insert_video(&pool, Some(doomed.id), "second").await;
    let dangling = Uuid::new_v4();

    assert!(video_repo::find_by_id(&pool, v1).await.unwrap().is_some());

    // v1 twice, a dangling id in the middle, then v2
    sqlx::query("UPDATE users SET watch_history = $2 WHERE id = $1")
        .bind(viewer.id)
        .bind(vec![v1, dangling, v2, v1])
        .execute(&pool)
        .await
        .expect("set history");

    // Deleting the owner leaves the video behind with no owner
    user_repo::delete_user(&pool, doomed.id).await.expect("delete owner");

    let watched = history::get_watch_history(&pool, viewer.id)
        .await
        .expect("history");

    let ids: Vec<Uuid> = watched.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![v1, v2, v1], "order kept, duplicates kept, dangling id dropped");

    assert_eq!(
        watched[0].owner.as_ref().map(|o| o.username.as_str()),
        Some(creator.username.as_str())
    );
    assert!(watched[1].owner.is_none(), "vanished owner is absent, not an error");

    let missing = history::get_watch_history(&pool, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    sqlx::query("DELETE FROM videos WHERE id IN ($1, $2)")
        .bind(v1)
        .bind(v2)
        .execute(&pool)
        .await
        .expect("cleanup videos");
    for user in [viewer, creator] {
        user_repo::delete_user(&pool, user.id).await.expect("cleanup");
    }
}
