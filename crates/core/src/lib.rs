//! Document upload service core: data model, fingerprints, local staging,
//! object/metadata store collaborators and the workflows that tie them together.

pub mod document;
pub mod fingerprint;
pub mod service;
pub mod staging;
pub mod store;

pub use document::{Document, FileId, Lifecycle, NameFilter, NewDocument};
pub use service::{DocumentService, RetrievedFile, ServiceError, ServiceSettings};
