//! S3-compatible object store (AWS S3, MinIO, ...).

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;

use super::{BlobReader, ObjectStore, ObjectStoreError};

const DEFAULT_REGION: &str = "us-east-1";

/// Addressing style for bucket names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketLookup {
    /// Path style when a custom endpoint is configured, virtual-host otherwise.
    #[default]
    Auto,
    /// Virtual-host style: `bucket.endpoint/key`.
    Dns,
    /// Path style: `endpoint/bucket/key`.
    Path,
}

impl BucketLookup {
    fn force_path_style(self, custom_endpoint: bool) -> bool {
        match self {
            BucketLookup::Auto => custom_endpoint,
            BucketLookup::Dns => false,
            BucketLookup::Path => true,
        }
    }
}

impl FromStr for BucketLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "0" => Ok(BucketLookup::Auto),
            "dns" | "1" => Ok(BucketLookup::Dns),
            "path" | "2" => Ok(BucketLookup::Path),
            other => Err(format!("unknown bucket lookup {other:?} (expected auto|dns|path)")),
        }
    }
}

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint such as `http://localhost:9000`; `None` for AWS.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub region: String,
    pub bucket_lookup: BucketLookup,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            region: DEFAULT_REGION.to_string(),
            bucket_lookup: BucketLookup::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    /// Build a client from explicit settings. Static credentials win; without
    /// them the default AWS provider chain is used.
    pub async fn connect(config: &S3Config) -> Self {
        let region = Region::new(config.region.clone());

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    config.session_token.clone(),
                    None,
                    "fileserver-static",
                )),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(
            config.bucket_lookup.force_path_style(config.endpoint.is_some()),
        );

        tracing::info!(
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            region = %config.region,
            bucket_lookup = ?config.bucket_lookup,
            "Configured S3 object store"
        );

        Self::from_client(Client::from_conf(builder.build()), &config.region)
    }

    pub fn from_client(client: Client, region: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
        }
    }

    fn backend<E: std::error::Error>(context: &str, err: E) -> ObjectStoreError {
        ObjectStoreError::Backend(format!("{context}: {}", DisplayErrorContext(err)))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => return Ok(()),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {}
            Err(err) => return Err(Self::backend("failed to check bucket", err)),
        }

        tracing::info!(bucket, "Bucket does not exist, creating it");

        // us-east-1 rejects an explicit location constraint.
        let configuration = (self.region != DEFAULT_REGION).then(|| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build()
        });

        match self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(configuration)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(bucket, "Bucket created");
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(err) => Err(Self::backend("failed to create bucket", err)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<u64, ObjectStoreError> {
        let len = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Self::backend("failed to open upload body", e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/octet-stream")
            .content_length(len as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| Self::backend("failed to upload object", e))?;

        Ok(len)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<BlobReader, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    ObjectStoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    Self::backend("failed to get object", err)
                }
            })?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::backend("failed to delete object", e))?;

        tracing::info!(bucket, key, "Object deleted");
        Ok(())
    }
}
