use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::info;

use crate::common::error::{WorkerError, WorkerResult};
use crate::config::settings::StorageConfig;
use crate::modules::job::service::Publisher;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
}

impl StorageService {
    /// Static keys when both are configured, otherwise the SDK's default
    /// credential chain. A custom endpoint (MinIO and friends) implies
    /// path-style addressing.
    pub async fn new(config: &StorageConfig) -> Self {
        let builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
            }
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        let mut builder = builder.region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, endpoint = ?config.endpoint, "✅ Storage client ready");

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }

    pub async fn put_file(&self, path: &Path, key: &str) -> WorkerResult<String> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| WorkerError::publish(format!("cannot read {}: {}", path.display(), e)))?;

        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type.essence_str())
            .body(body)
            .send()
            .await
            .map_err(|e| WorkerError::publish(DisplayErrorContext(&e).to_string()))?;

        Ok(key.to_string())
    }
}

/// Publisher over a storage client that is built on first use, at most once.
pub struct S3Publisher {
    config: StorageConfig,
    storage: OnceCell<StorageService>,
}

impl S3Publisher {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            storage: OnceCell::new(),
        }
    }

    pub async fn storage(&self) -> &StorageService {
        self.storage
            .get_or_init(|| StorageService::new(&self.config))
            .await
    }
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn publish(&self, path: &Path, key: &str) -> WorkerResult<String> {
        let storage = self.storage().await;
        info!(bucket = %storage.bucket, key, "Uploading result");
        let stored = storage.put_file(path, key).await?;
        info!(key = %stored, "Upload finished");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> StorageConfig {
        StorageConfig {
            endpoint: Some(endpoint.to_string()),
            region: "us-east-1".to_string(),
            bucket: "media-processed".to_string(),
            access_key: Some("minio".to_string()),
            secret_key: Some("minio-secret".to_string()),
        }
    }

    #[tokio::test]
    async fn client_is_initialised_once() {
        let publisher = S3Publisher::new(config("http://127.0.0.1:9"));

        let first = publisher.storage().await as *const StorageService;
        let second = publisher.storage().await as *const StorageService;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn uploads_under_the_given_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/media-processed/processed/j1/output.png"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("output.png");
        std::fs::write(&file, b"\x89PNG fake").unwrap();

        let key = S3Publisher::new(config(&server.uri()))
            .publish(&file, "processed/j1/output.png")
            .await
            .unwrap();

        assert_eq!(key, "processed/j1/output.png");
    }

    #[tokio::test]
    async fn rejected_upload_is_a_publish_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<Error><Code>AccessDenied</Code><Message>denied</Message></Error>",
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("output.jpg");
        std::fs::write(&file, b"jpeg").unwrap();

        let err = S3Publisher::new(config(&server.uri()))
            .publish(&file, "processed/j1/output.jpg")
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Publish(_)));
    }

    #[tokio::test]
    async fn missing_local_file_is_a_publish_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = S3Publisher::new(config("http://127.0.0.1:9"))
            .publish(&dir.path().join("nope.png"), "processed/j1/output.png")
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Publish(ref msg) if msg.contains("nope.png")));
    }
}
