/// Session manager: token-pair issuance, rotation, invalidation, and the
/// account operations that touch credentials or stored media references.
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::models::{TokenPair, UserProfile};
use crate::security::{jwt, password};
use crate::services::media_store::MediaStore;
use crate::validators;

/// Registration input after transport decoding. `avatar_source` and
/// `cover_source` are staged references resolved through the media store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar_source: String,
    pub cover_source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

/// Create an account. The uploaded avatar is mandatory; a failed insert
/// after upload cleans the uploaded objects back up so no orphan state
/// survives the error.
pub async fn register(
    pool: &PgPool,
    media: &Arc<dyn MediaStore>,
    account: NewAccount,
) -> Result<UserProfile> {
    let fullname = account.fullname.trim();
    let email = account.email.trim();
    let username = account.username.trim();

    if [fullname, email, username, account.password.as_str()]
        .iter()
        .any(|field| validators::is_blank(field))
    {
        return Err(AppError::Validation("all fields are required".to_string()));
    }
    if !validators::validate_email(email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if !validators::validate_username(username) {
        return Err(AppError::Validation(
            "username must be 3-32 characters: letters, digits, '_' or '-'".to_string(),
        ));
    }
    if validators::is_blank(&account.avatar_source) {
        return Err(AppError::Validation("avatar file is required".to_string()));
    }

    // Strength check happens inside the hash step.
    let password_hash = password::hash_password(&account.password)?;

    if user_repo::identity_exists(pool, username, email).await? {
        return Err(AppError::Conflict(
            "user with email or username already exists".to_string(),
        ));
    }

    let avatar_url = media.upload(account.avatar_source.trim()).await?;
    let cover_url = match account.cover_source.as_deref().map(str::trim) {
        Some(source) if !source.is_empty() => Some(media.upload(source).await?),
        _ => None,
    };

    let created = user_repo::create_user(
        pool,
        username,
        email,
        fullname,
        &password_hash,
        &avatar_url,
        cover_url.as_deref(),
    )
    .await;

    match created {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "user registered");
            Ok(user.into())
        }
        Err(e) => {
            // No orphan media when the insert lost a uniqueness race.
            let _ = media.delete(&avatar_url).await;
            if let Some(url) = &cover_url {
                let _ = media.delete(url).await;
            }
            Err(map_unique_violation(
                e,
                "user with email or username already exists",
            ))
        }
    }
}

/// Authenticate by username or email and issue a fresh token pair.
pub async fn login(
    pool: &PgPool,
    jwt_cfg: &JwtConfig,
    input: LoginInput,
) -> Result<(UserProfile, TokenPair)> {
    let username = input
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let email = input
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if username.is_none() && email.is_none() {
        return Err(AppError::Validation(
            "either username or email is required".to_string(),
        ));
    }

    let user = user_repo::find_by_identifier(pool, username, email)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    password::verify_password(&input.password, &user.password_hash)?;

    let pair = issue_token_pair(pool, jwt_cfg, user.id, None).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok((user.into(), pair))
}

/// Generate and persist a fresh token pair. This is the single point of
/// refresh-token mutation.
///
/// `expected_prior` selects the store behavior: `None` overwrites whatever
/// is persisted (login - no prior value to race against), `Some(tok)` makes
/// the write a compare-and-swap so that of two racing refresh calls exactly
/// one wins and the other observes the mismatch.
pub async fn issue_token_pair(
    pool: &PgPool,
    jwt_cfg: &JwtConfig,
    user_id: Uuid,
    expected_prior: Option<&str>,
) -> Result<TokenPair> {
    let pair = jwt::generate_token_pair(
        user_id,
        jwt_cfg.access_token_ttl,
        jwt_cfg.refresh_token_ttl,
    )
    .map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        AppError::Internal("something went wrong while generating tokens".to_string())
    })?;

    let applied =
        user_repo::swap_refresh_token(pool, user_id, expected_prior, &pair.refresh_token).await?;

    if !applied {
        if expected_prior.is_some() {
            // Audit trail: reuse of a rotated token and a lost concurrent
            // rotation are indistinguishable here, and both end the session.
            tracing::warn!(user_id = %user_id, "refresh token reuse or concurrent rotation detected");
            return Err(AppError::Authentication(
                "invalid refresh token".to_string(),
            ));
        }
        return Err(AppError::NotFound("user does not exist".to_string()));
    }

    Ok(pair)
}

/// Exchange a valid, still-current refresh token for a new pair.
/// A token that was already rotated away always fails, however narrowly it
/// lost the race.
pub async fn refresh(
    pool: &PgPool,
    jwt_cfg: &JwtConfig,
    presented: Option<&str>,
) -> Result<TokenPair> {
    let presented = presented
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Authentication("unauthorized request".to_string()))?;

    let user_id = jwt::validate_typed_token(presented, jwt::TOKEN_TYPE_REFRESH).map_err(|e| {
        tracing::debug!("Refresh token verification failed: {}", e);
        AppError::Authentication("invalid refresh token".to_string())
    })?;

    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("invalid refresh token".to_string()))?;

    let pair = issue_token_pair(pool, jwt_cfg, user.id, Some(presented)).await?;
    tracing::info!(user_id = %user.id, "token pair rotated");

    Ok(pair)
}

/// End the session server-side by clearing the stored refresh token.
pub async fn logout(pool: &PgPool, user_id: Uuid) -> Result<()> {
    user_repo::clear_refresh_token(pool, user_id).await?;
    tracing::info!(user_id = %user_id, "user logged out");
    Ok(())
}

/// Rehash and store a new password after verifying the old one.
/// Outstanding access tokens stay valid until natural expiry.
pub async fn change_password(
    pool: &PgPool,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<()> {
    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    password::verify_password(old_password, &user.password_hash)
        .map_err(|_| AppError::Authentication("invalid old password".to_string()))?;

    let new_hash = password::hash_password(new_password)?;
    user_repo::update_password(pool, user_id, &new_hash).await?;

    tracing::info!(user_id = %user_id, "password changed");
    Ok(())
}

/// Current-session user projection.
pub async fn current_user(pool: &PgPool, user_id: Uuid) -> Result<UserProfile> {
    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    Ok(user.into())
}

/// Update fullname and email.
pub async fn update_account(
    pool: &PgPool,
    user_id: Uuid,
    fullname: &str,
    email: &str,
) -> Result<UserProfile> {
    let fullname = fullname.trim();
    let email = email.trim();

    if validators::is_blank(fullname) || validators::is_blank(email) {
        return Err(AppError::Validation("all fields are required".to_string()));
    }
    if !validators::validate_email(email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }

    let updated = user_repo::update_account(pool, user_id, fullname, email)
        .await
        .map_err(|e| map_unique_violation(e, "email already in use"))?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    Ok(updated.into())
}

/// Replace the avatar. The previous object is deleted only after the new
/// reference is committed, and only best-effort.
pub async fn update_avatar(
    pool: &PgPool,
    media: &Arc<dyn MediaStore>,
    user_id: Uuid,
    source_ref: &str,
) -> Result<UserProfile> {
    if validators::is_blank(source_ref) {
        return Err(AppError::Validation("avatar file is missing".to_string()));
    }

    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    let new_url = media.upload(source_ref.trim()).await?;

    let updated = match user_repo::update_avatar(pool, user_id, &new_url).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            let _ = media.delete(&new_url).await;
            return Err(AppError::NotFound("user does not exist".to_string()));
        }
        Err(e) => {
            let _ = media.delete(&new_url).await;
            return Err(AppError::Database(e));
        }
    };

    schedule_media_delete(media, user.avatar_url);

    Ok(updated.into())
}

/// Replace the cover image. Same delete-after-commit ordering as avatars;
/// a user may not have had a cover before.
pub async fn update_cover(
    pool: &PgPool,
    media: &Arc<dyn MediaStore>,
    user_id: Uuid,
    source_ref: &str,
) -> Result<UserProfile> {
    if validators::is_blank(source_ref) {
        return Err(AppError::Validation(
            "cover image file is missing".to_string(),
        ));
    }

    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".to_string()))?;

    let new_url = media.upload(source_ref.trim()).await?;

    let updated = match user_repo::update_cover(pool, user_id, &new_url).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            let _ = media.delete(&new_url).await;
            return Err(AppError::NotFound("user does not exist".to_string()));
        }
        Err(e) => {
            let _ = media.delete(&new_url).await;
            return Err(AppError::Database(e));
        }
    };

    if let Some(old) = user.cover_url {
        schedule_media_delete(media, old);
    }

    Ok(updated.into())
}

/// Fire-and-forget removal of a replaced media object. Failure is logged,
/// never propagated.
fn schedule_media_delete(media: &Arc<dyn MediaStore>, remote_ref: String) {
    let media = Arc::clone(media);
    tokio::spawn(async move {
        if let Err(e) = media.delete(&remote_ref).await {
            tracing::warn!("Failed to delete replaced media {}: {}", remote_ref, e);
        }
    });
}
