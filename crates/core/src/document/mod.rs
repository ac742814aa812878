pub mod filter;
pub mod id;
pub mod model;
pub mod validate;

pub use filter::NameFilter;
pub use id::{FileId, FileIdError};
pub use model::{Document, DocumentRow, Lifecycle, NewDocument};
pub use validate::ValidationError;
