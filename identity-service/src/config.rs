use anyhow::Context;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_env")]
    pub env: String,

    #[serde(default = "default_app_host")]
    pub host: String,

    #[serde(default = "default_app_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,

    /// Access token lifetime in seconds (short-lived, stateless).
    #[serde(default = "default_jwt_access_ttl")]
    pub access_token_ttl: i64,

    /// Refresh token lifetime in seconds (long-lived, persisted server-side).
    #[serde(default = "default_jwt_refresh_ttl")]
    pub refresh_token_ttl: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub bucket_name: String,
    pub region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,

    /// Public base URL served back to clients (CDN or bucket endpoint).
    pub public_base_url: String,

    /// Optional custom endpoint for S3-compatible stores (MinIO, localstack).
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or "*" to allow all.
    pub allowed_origins: String,

    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// Default value functions
fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_jwt_access_ttl() -> i64 {
    900 // 15 minutes
}

fn default_jwt_refresh_ttl() -> i64 {
    864000 // 10 days
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig {
            env: env::var("APP_ENV").unwrap_or_else(|_| default_app_env()),
            host: env::var("APP_HOST").unwrap_or_else(|_| default_app_host()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| default_app_port().to_string())
                .parse()
                .unwrap_or(default_app_port()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| default_db_max_connections().to_string())
                .parse()
                .unwrap_or(default_db_max_connections()),
        };

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: env::var("JWT_ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| default_jwt_access_ttl().to_string())
                .parse()
                .unwrap_or(default_jwt_access_ttl()),
            refresh_token_ttl: env::var("JWT_REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| default_jwt_refresh_ttl().to_string())
                .parse()
                .unwrap_or(default_jwt_refresh_ttl()),
        };

        let media = MediaConfig {
            bucket_name: env::var("MEDIA_BUCKET_NAME").context("MEDIA_BUCKET_NAME must be set")?,
            region: env::var("MEDIA_REGION").context("MEDIA_REGION must be set")?,
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID")
                .context("AWS_ACCESS_KEY_ID must be set")?,
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY")
                .context("AWS_SECRET_ACCESS_KEY must be set")?,
            public_base_url: env::var("MEDIA_PUBLIC_BASE_URL")
                .context("MEDIA_PUBLIC_BASE_URL must be set")?,
            endpoint: env::var("MEDIA_ENDPOINT").ok(),
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_age: env::var("CORS_MAX_AGE")
                .unwrap_or_else(|_| default_cors_max_age().to_string())
                .parse()
                .unwrap_or(default_cors_max_age()),
        };

        Ok(Config {
            app,
            database,
            jwt,
            media,
            cors,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
