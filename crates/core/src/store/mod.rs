//! Collaborator interfaces consumed by the document workflows.
//!
//! The object store holds file bytes keyed by [`FileId`]; the metadata store
//! holds [`Document`] rows. Both are opaque services: production uses S3 and
//! PostgreSQL, tests use the in-memory implementations in [`memory`].

pub mod memory;
pub mod postgres;
pub mod s3;

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::document::{Document, FileId, NameFilter, NewDocument};

pub use memory::{MemoryDocumentRepository, MemoryObjectStore};
pub use postgres::PgDocumentRepository;
pub use s3::{BucketLookup, S3Config, S3ObjectStore};

/// Streaming body of a fetched blob.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("object store error: {0}")]
    Backend(String),

    #[error("object store i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` if it does not exist yet. Idempotent.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// Upload the file at `source` under `bucket/key`. Returns the byte count.
    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<u64, ObjectStoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<BlobReader, ObjectStoreError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("document {0} not found")]
    NotFound(FileId),

    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Metadata store for [`Document`] rows.
///
/// Every lookup ignores soft-deleted rows, while `insert` checks uniqueness of
/// `file_id` and `fingerprint` against all rows including deleted ones.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: NewDocument) -> Result<Document, RepositoryError>;

    async fn find_by_file_id(&self, file_id: FileId) -> Result<Option<Document>, RepositoryError>;

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Document>, RepositoryError>;

    /// Active documents matching `filter`, in insertion order.
    async fn search(&self, filter: &NameFilter) -> Result<Vec<Document>, RepositoryError>;

    /// Mark an active document deleted. `NotFound` if there is no active row.
    async fn soft_delete(&self, file_id: FileId) -> Result<Document, RepositoryError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
