use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::AppError;

/// Remote media collaborator: resolves a staged local reference into a
/// durable remote one, and deletes remote objects on replacement.
/// Deletion is best-effort by contract; callers must not fail an update
/// because a stale object could not be removed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, local_ref: &str) -> Result<String, AppError>;
    async fn delete(&self, remote_ref: &str) -> Result<(), AppError>;
}

/// S3-backed media store.
pub struct S3MediaStore {
    client: Client,
    config: MediaConfig,
}

impl S3MediaStore {
    /// Build an S3 client from the provided configuration.
    pub async fn new(config: &MediaConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "identity-service",
        );

        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            if !endpoint.trim().is_empty() {
                builder = builder.endpoint_url(endpoint);
            }
        }

        Ok(S3MediaStore {
            client: Client::from_conf(builder.build()),
            config: config.clone(),
        })
    }

    fn object_key(local_ref: &str) -> String {
        let ext = std::path::Path::new(local_ref)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        format!("uploads/{}.{}", Uuid::new_v4(), ext)
    }

    fn key_from_remote_ref(&self, remote_ref: &str) -> Option<String> {
        remote_ref
            .strip_prefix(self.config.public_base_url.trim_end_matches('/'))
            .map(|k| k.trim_start_matches('/').to_string())
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, local_ref: &str) -> Result<String, AppError> {
        let body = tokio::fs::read(local_ref)
            .await
            .map_err(|e| AppError::Upload(format!("cannot read staged file: {e}")))?;

        let key = Self::object_key(local_ref);

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("media upload failed: {e}")))?;

        // Staged file is no longer needed once the object is durable.
        if let Err(e) = tokio::fs::remove_file(local_ref).await {
            tracing::debug!("Failed to remove staged upload {}: {}", local_ref, e);
        }

        Ok(format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        ))
    }

    async fn delete(&self, remote_ref: &str) -> Result<(), AppError> {
        let Some(key) = self.key_from_remote_ref(remote_ref) else {
            return Err(AppError::Upload(format!(
                "remote reference outside managed store: {remote_ref}"
            )));
        };

        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("media delete failed: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_keeps_extension() {
        let key = S3MediaStore::object_key("/tmp/staged/photo.png");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_object_key_defaults_extension() {
        let key = S3MediaStore::object_key("/tmp/staged/no-extension");
        assert!(key.ends_with(".bin"));
    }
}
