//! Upload, retrieval, listing and deletion workflows.
//!
//! Each workflow runs its steps strictly in order and performs no rollback:
//! a blob written before a failed metadata insert stays orphaned. The only
//! concurrency safety is the metadata store's uniqueness on `file_id` and
//! `fingerprint`.

mod error;

use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::document::validate::validate_file_name;
use crate::document::{Document, FileId, NameFilter, NewDocument};
use crate::fingerprint::{FingerprintMode, Fingerprinter};
use crate::staging::{StagedFile, StagingDir};
use crate::store::{DocumentRepository, ObjectStore, ObjectStoreError};

pub use error::{ServiceError, ServiceResult};

pub const DEFAULT_BUCKET: &str = "documents";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 << 20;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Bucket holding every blob.
    pub bucket: String,
    pub max_upload_bytes: u64,
    pub fingerprint_mode: FingerprintMode,
    /// Also remove the blob when a document is soft-deleted.
    pub delete_blob_on_delete: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fingerprint_mode: FingerprintMode::default(),
            delete_blob_on_delete: false,
        }
    }
}

/// A downloaded blob staged locally, ready to stream back.
/// Dropping it removes the staged copy.
#[derive(Debug)]
pub struct RetrievedFile {
    pub document: Document,
    pub staged: StagedFile,
    pub size: u64,
}

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentRepository>,
    objects: Arc<dyn ObjectStore>,
    staging: StagingDir,
    settings: ServiceSettings,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        objects: Arc<dyn ObjectStore>,
        staging: StagingDir,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            documents,
            objects,
            staging,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Stage `body`, reject duplicate content, store the blob, record metadata.
    pub async fn upload<S>(&self, name: &str, body: S) -> ServiceResult<Document>
    where
        S: Stream<Item = Result<Bytes, ServiceError>>,
    {
        let name = validate_file_name(Some(name))?;
        let staged = self.staging.stage(name).await?;

        let (fingerprint, size) = self.stage_upload(&staged, body).await?;
        tracing::debug!(file_name = name, size, fingerprint = %fingerprint, "Upload staged");

        if let Some(existing) = self.documents.find_by_fingerprint(&fingerprint).await? {
            tracing::info!(
                file_name = name,
                existing_file_id = %existing.file_id,
                fingerprint = %fingerprint,
                "Rejected duplicate upload"
            );
            return Err(ServiceError::Duplicate { fingerprint });
        }

        let file_id = FileId::generate();
        let key = file_id.key();
        self.objects.ensure_bucket(&self.settings.bucket).await?;
        self.objects
            .put(&self.settings.bucket, &key, staged.path())
            .await?;

        let new_document = NewDocument {
            name: name.to_string(),
            file_id,
            fingerprint,
        };
        let document = match self.documents.insert(new_document).await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(
                    bucket = %self.settings.bucket,
                    key = %key,
                    error = %err,
                    "Metadata insert failed, blob left orphaned"
                );
                return Err(ServiceError::Metadata(err));
            }
        };

        tracing::info!(
            file_name = %document.name,
            file_id = %document.file_id,
            bytes = size,
            "Document uploaded"
        );
        Ok(document)
    }

    async fn stage_upload<S>(&self, staged: &StagedFile, body: S) -> ServiceResult<(String, u64)>
    where
        S: Stream<Item = Result<Bytes, ServiceError>>,
    {
        let limit = self.settings.max_upload_bytes;
        let mut body = std::pin::pin!(body);
        let mut out = staged.writer().await?;
        let mut fingerprinter = Fingerprinter::new(self.settings.fingerprint_mode);
        let mut size: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > limit {
                return Err(ServiceError::TooLarge { limit });
            }
            fingerprinter.update(&chunk);
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        Ok((fingerprinter.finish(), size))
    }

    /// Fetch an active document's blob into a local staging file.
    pub async fn retrieve(&self, file_id: FileId) -> ServiceResult<RetrievedFile> {
        let document = self
            .documents
            .find_by_file_id(file_id)
            .await?
            .ok_or(ServiceError::NotFound(file_id))?;

        let key = file_id.key();
        let mut blob = self
            .objects
            .get(&self.settings.bucket, &key)
            .await
            .map_err(|err| match err {
                ObjectStoreError::NotFound { .. } => {
                    tracing::warn!(file_id = %file_id, "Metadata present but blob missing");
                    ServiceError::NotFound(file_id)
                }
                other => ServiceError::Storage(other),
            })?;

        let staged = self.staging.stage(&key).await?;
        let mut out = staged.writer().await?;
        let size = tokio::io::copy(&mut blob, &mut out).await?;
        out.flush().await?;

        tracing::info!(file_id = %file_id, bytes = size, "Sending file");
        Ok(RetrievedFile {
            document,
            staged,
            size,
        })
    }

    /// Active documents whose name contains `search`, case-insensitively.
    pub async fn list(&self, search: Option<&str>) -> ServiceResult<Vec<Document>> {
        let filter = NameFilter::new(search);
        let documents = self.documents.search(&filter).await?;
        tracing::debug!(term = ?filter.term(), count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// Soft-delete a document. The blob is kept unless `delete_blob_on_delete`.
    pub async fn delete(&self, file_id: FileId) -> ServiceResult<Document> {
        let document = self.documents.soft_delete(file_id).await?;
        tracing::info!(file_id = %file_id, file_name = %document.name, "Document soft-deleted");

        if self.settings.delete_blob_on_delete {
            if let Err(err) = self
                .objects
                .delete(&self.settings.bucket, &file_id.key())
                .await
            {
                tracing::warn!(file_id = %file_id, error = %err, "Failed to delete blob");
            }
        }

        Ok(document)
    }

    pub async fn check_metadata_store(&self) -> ServiceResult<()> {
        self.documents.ping().await?;
        Ok(())
    }
}
