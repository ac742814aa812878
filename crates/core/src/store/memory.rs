//! In-process collaborators for tests and local experiments.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{BlobReader, DocumentRepository, ObjectStore, ObjectStoreError, RepositoryError};
use crate::document::{Document, FileId, Lifecycle, NameFilter, NewDocument};

/// Buckets of blobs held in memory. A put into a bucket that was never
/// ensured fails, like a real S3 endpoint would.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
    fail_puts: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock().get(bucket).and_then(|objects| objects.get(key).cloned())
    }

    /// Remove a blob behind the metadata store's back.
    pub fn evict(&self, bucket: &str, key: &str) {
        if let Some(objects) = self.lock().get_mut(bucket) {
            objects.remove(key);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, Vec<u8>>>> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        self.lock().entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<u64, ObjectStoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("injected put failure".to_string()));
        }
        let bytes = tokio::fs::read(source).await?;
        let len = bytes.len() as u64;

        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::Backend(format!("bucket {bucket} does not exist")))?;
        objects.insert(key.to_string(), bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(len)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<BlobReader, ObjectStoreError> {
        let bytes = self.object(bucket, key).ok_or_else(|| ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.evict(bucket, key);
        Ok(())
    }
}

/// Vec-backed metadata store with the same uniqueness rules as the SQL table.
#[derive(Debug, Default)]
pub struct MemoryDocumentRepository {
    rows: Mutex<Vec<Document>>,
    fail_inserts: AtomicBool,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail with a database error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Every row, deleted ones included.
    pub fn all_rows(&self) -> Vec<Document> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Document>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn insert(&self, document: NewDocument) -> Result<Document, RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut rows = self.lock();
        // Deleted rows count: uniqueness is table-wide.
        if rows.iter().any(|d| d.file_id == document.file_id) {
            return Err(RepositoryError::UniqueViolation {
                constraint: "documents_file_id_key".to_string(),
            });
        }
        if rows.iter().any(|d| d.fingerprint == document.fingerprint) {
            return Err(RepositoryError::UniqueViolation {
                constraint: "documents_fingerprint_key".to_string(),
            });
        }

        let now = Utc::now();
        let doc = Document {
            id: rows.len() as i64 + 1,
            name: document.name,
            file_id: document.file_id,
            fingerprint: document.fingerprint,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        };
        rows.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_file_id(&self, file_id: FileId) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .lock()
            .iter()
            .find(|d| d.is_active() && d.file_id == file_id)
            .cloned())
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .lock()
            .iter()
            .find(|d| d.is_active() && d.fingerprint == fingerprint)
            .cloned())
    }

    async fn search(&self, filter: &NameFilter) -> Result<Vec<Document>, RepositoryError> {
        Ok(self
            .lock()
            .iter()
            .filter(|d| d.is_active() && filter.matches(&d.name))
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, file_id: FileId) -> Result<Document, RepositoryError> {
        let mut rows = self.lock();
        let doc = rows
            .iter_mut()
            .find(|d| d.is_active() && d.file_id == file_id)
            .ok_or(RepositoryError::NotFound(file_id))?;
        let now = Utc::now();
        doc.lifecycle = Lifecycle::Deleted { at: now };
        doc.updated_at = now;
        Ok(doc.clone())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
