//! File identifier parsing.
//!
//! Every uploaded file is addressed by a UUID generated once at upload time.
//! The same value is the object-store key and the public handle used in
//! `/file/{idFile}` routes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("invalid file id {input:?}: {source}")]
pub struct FileIdError {
    input: String,
    #[source]
    source: uuid::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        FileId(Uuid::new_v4())
    }

    /// Object-store key for this file.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl FromStr for FileId {
    type Err = FileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(FileId)
            .map_err(|source| FileIdError {
                input: s.to_string(),
                source,
            })
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
