use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::FileId;

/// Soft-delete state of a document.
///
/// A deleted document stays in the table, and its `fileId` and `fingerprint`
/// stay reserved: uniqueness is checked against every row, deleted or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted { at } => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Lifecycle {
    fn from(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => Lifecycle::Active,
            Some(at) => Lifecycle::Deleted { at },
        }
    }
}

// On the wire the lifecycle is the nullable `deletedAt` timestamp.
impl Serialize for Lifecycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.deleted_at().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Lifecycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer).map(Lifecycle::from)
    }
}

/// A stored file's metadata record. Maps to the `documents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub file_id: FileId,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "deletedAt")]
    pub lifecycle: Lifecycle,
}

impl Document {
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Insert payload; the store assigns `id` and the timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub file_id: FileId,
    pub fingerprint: String,
}

/// Database row representation of a document.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: i64,
    pub name: String,
    pub file_id: FileId,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            name: row.name,
            file_id: row.file_id,
            fingerprint: row.fingerprint,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}
