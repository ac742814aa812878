use async_trait::async_trait;
use sqlx::PgPool;

use super::{DocumentRepository, RepositoryError};
use crate::document::{Document, DocumentRow, FileId, NameFilter, NewDocument};

/// `documents` table access over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, document: NewDocument) -> Result<Document, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "INSERT INTO documents (name, file_id, fingerprint) \
             VALUES ($1, $2, $3) \
             RETURNING id, name, file_id, fingerprint, created_at, updated_at, deleted_at",
        )
        .bind(&document.name)
        .bind(document.file_id)
        .bind(&document.fingerprint)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    async fn find_by_file_id(&self, file_id: FileId) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, name, file_id, fingerprint, created_at, updated_at, deleted_at \
             FROM documents WHERE file_id = $1 AND deleted_at IS NULL",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, name, file_id, fingerprint, created_at, updated_at, deleted_at \
             FROM documents WHERE fingerprint = $1 AND deleted_at IS NULL",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn search(&self, filter: &NameFilter) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, name, file_id, fingerprint, created_at, updated_at, deleted_at \
             FROM documents WHERE deleted_at IS NULL AND name ILIKE $1 ESCAPE '\\' \
             ORDER BY id",
        )
        .bind(filter.like_pattern())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn soft_delete(&self, file_id: FileId) -> Result<Document, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "UPDATE documents SET deleted_at = now(), updated_at = now() \
             WHERE file_id = $1 AND deleted_at IS NULL \
             RETURNING id, name, file_id, fingerprint, created_at, updated_at, deleted_at",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(Document::from)
            .ok_or(RepositoryError::NotFound(file_id))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
