use crate::document::{FileId, ValidationError};
use crate::store::{ObjectStoreError, RepositoryError};

/// Failure of a document workflow, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("malformed upload: {0}")]
    Malformed(String),

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("document already exists")]
    Duplicate { fingerprint: String },

    #[error("document {0} not found")]
    NotFound(FileId),

    #[error("local staging failed: {0}")]
    Staging(#[from] std::io::Error),

    #[error("object store failed: {0}")]
    Storage(#[from] ObjectStoreError),

    #[error("metadata store failed: {0}")]
    Metadata(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Metadata(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
