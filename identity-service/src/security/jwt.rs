use anyhow::{anyhow, Result};
/// Credential signer: HS256-signed, time-bound tokens in two TTL classes.
/// Access tokens are stateless; refresh tokens must additionally match the
/// single value persisted on the user record to be honored.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::TokenPair;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
    /// Unique token id; two tokens minted in the same second still differ
    pub jti: String,
}

// Thread-safe storage for the signing secret loaded at startup
lazy_static! {
    static ref JWT_KEYS: RwLock<Option<(EncodingKey, DecodingKey)>> = RwLock::new(None);
}

/// Initialize the signing secret.
/// Must be called during application startup before any token operations.
pub fn initialize_secret(secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        return Err(anyhow!("JWT secret must not be empty"));
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut keys = JWT_KEYS
        .write()
        .map_err(|e| anyhow!("Failed to acquire write lock on JWT keys: {}", e))?;
    *keys = Some((encoding_key, decoding_key));

    Ok(())
}

fn get_encoding_key() -> Result<EncodingKey> {
    let keys = JWT_KEYS
        .read()
        .map_err(|e| anyhow!("Failed to acquire read lock on JWT keys: {}", e))?;

    keys.as_ref()
        .map(|(enc, _)| enc.clone())
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_secret() during startup"))
}

fn get_decoding_key() -> Result<DecodingKey> {
    let keys = JWT_KEYS
        .read()
        .map_err(|e| anyhow!("Failed to acquire read lock on JWT keys: {}", e))?;

    keys.as_ref()
        .map(|(_, dec)| dec.clone())
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_secret() during startup"))
}

fn generate_token(user_id: Uuid, token_type: &str, ttl_secs: i64) -> Result<String> {
    let now = Utc::now();
    let expiry = now + Duration::seconds(ttl_secs);

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        token_type: token_type.to_string(),
        jti: Uuid::new_v4().to_string(),
    };

    let encoding_key = get_encoding_key()?;
    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| anyhow!("Failed to generate {} token: {}", token_type, e))
}

/// Generate a new short-lived access token
pub fn generate_access_token(user_id: Uuid, ttl_secs: i64) -> Result<String> {
    generate_token(user_id, TOKEN_TYPE_ACCESS, ttl_secs)
}

/// Generate a new long-lived refresh token
pub fn generate_refresh_token(user_id: Uuid, ttl_secs: i64) -> Result<String> {
    generate_token(user_id, TOKEN_TYPE_REFRESH, ttl_secs)
}

/// Generate both access and refresh tokens
pub fn generate_token_pair(
    user_id: Uuid,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
) -> Result<TokenPair> {
    let access_token = generate_access_token(user_id, access_ttl_secs)?;
    let refresh_token = generate_refresh_token(user_id, refresh_ttl_secs)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validate signature and expiry, returning the decoded claims
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let decoding_key = get_decoding_key()?;
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| anyhow!("Token validation failed: {}", e))
}

/// Validate a token and require a specific token_type claim.
/// Returns the subject user id.
pub fn validate_typed_token(token: &str, expected_type: &str) -> Result<Uuid> {
    let token_data = validate_token(token)?;
    if token_data.claims.token_type != expected_type {
        return Err(anyhow!(
            "Expected {} token, got {}",
            expected_type,
            token_data.claims.token_type
        ));
    }
    Uuid::parse_str(&token_data.claims.sub).map_err(|e| anyhow!("Invalid user ID in token: {}", e))
}
