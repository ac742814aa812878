//! Content fingerprints used for duplicate detection.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How an upload's fingerprint is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintMode {
    /// SHA-256 of the uploaded bytes. Identical content always collides.
    #[default]
    Content,
    /// A fresh random value per upload. Duplicate detection never fires.
    Random,
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" | "sha256" => Ok(FingerprintMode::Content),
            "random" => Ok(FingerprintMode::Random),
            other => Err(format!("unknown fingerprint mode {other:?} (expected content|random)")),
        }
    }
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintMode::Content => f.write_str("content"),
            FingerprintMode::Random => f.write_str("random"),
        }
    }
}

/// Incremental fingerprint, fed chunk by chunk while an upload is staged.
pub struct Fingerprinter {
    hasher: Option<Sha256>,
}

impl Fingerprinter {
    pub fn new(mode: FingerprintMode) -> Self {
        let hasher = match mode {
            FingerprintMode::Content => Some(Sha256::new()),
            FingerprintMode::Random => None,
        };
        Self { hasher }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(chunk);
        }
    }

    /// Lowercase hex digest, or a random UUID string in `Random` mode.
    pub fn finish(self) -> String {
        match self.hasher {
            Some(hasher) => hex::encode(hasher.finalize()),
            None => Uuid::new_v4().to_string(),
        }
    }
}
