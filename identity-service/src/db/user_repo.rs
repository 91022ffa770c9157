/// User repository - all database operations on the users table
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, fullname, password_hash, avatar_url, cover_url, refresh_token, watch_history, created_at, updated_at";

/// Create a new user. Username and email are stored lower-cased so that
/// uniqueness and lookups are case-insensitive.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    fullname: &str,
    password_hash: &str,
    avatar_url: &str,
    cover_url: Option<&str>,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (id, username, email, fullname, password_hash, avatar_url, cover_url, watch_history, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, '{{}}', $8, $8)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(username.to_lowercase())
    .bind(email.to_lowercase())
    .bind(fullname)
    .bind(password_hash)
    .bind(avatar_url)
    .bind(cover_url)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Find a user by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Find a user by username or email; either identifier may be absent.
pub async fn find_by_identifier(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE ($1::text IS NOT NULL AND username = $1)
           OR ($2::text IS NOT NULL AND email = $2)
        LIMIT 1
        "#
    ))
    .bind(username.map(|u| u.to_lowercase()))
    .bind(email.map(|e| e.to_lowercase()))
    .fetch_optional(pool)
    .await
}

/// Check if a username or email is already taken
pub async fn identity_exists(
    pool: &PgPool,
    username: &str,
    email: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
    )
    .bind(username.to_lowercase())
    .bind(email.to_lowercase())
    .fetch_one(pool)
    .await
}

/// Persist a refresh token in a single conditional UPDATE.
///
/// With `expected = None` the stored value is overwritten unconditionally
/// (login: there is no prior token to race against). With `expected =
/// Some(tok)` the write applies only while the stored value still equals
/// `tok` - the compare-and-swap that makes rotation single-use. Returns
/// whether the write was applied; a `false` on the CAS path means the
/// presented token was already rotated away or the session was logged out.
pub async fn swap_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    expected: Option<&str>,
    new_token: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();

    let result = match expected {
        Some(expected) => {
            sqlx::query(
                "UPDATE users SET refresh_token = $3, updated_at = $4 WHERE id = $1 AND refresh_token = $2",
            )
            .bind(user_id)
            .bind(expected)
            .bind(new_token)
            .bind(now)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query("UPDATE users SET refresh_token = $2, updated_at = $3 WHERE id = $1")
                .bind(user_id)
                .bind(new_token)
                .bind(now)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected() == 1)
}

/// Clear the stored refresh token, ending the session server-side. Idempotent.
pub async fn clear_refresh_token(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = $2 WHERE id = $1")
        .bind(user_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(())
}

/// Update a user's password hash
pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    new_password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(user_id)
        .bind(new_password_hash)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(())
}

/// Update fullname and email
pub async fn update_account(
    pool: &PgPool,
    user_id: Uuid,
    fullname: &str,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET fullname = $2, email = $3, updated_at = $4
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(fullname)
    .bind(email.to_lowercase())
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

/// Replace the avatar reference, returning the updated record
pub async fn update_avatar(
    pool: &PgPool,
    user_id: Uuid,
    avatar_url: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET avatar_url = $2, updated_at = $3
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(avatar_url)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

/// Replace the cover image reference, returning the updated record
pub async fn update_cover(
    pool: &PgPool,
    user_id: Uuid,
    cover_url: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET cover_url = $2, updated_at = $3
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(cover_url)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

/// Delete a user (test/support tooling; account deletion is out of scope)
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
