/// Uploaded filename checks.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("uploaded file has no name")]
    MissingName,
    #[error("uploaded file name cannot be empty")]
    EmptyName,
}

/// Validate the client-supplied filename. A name made only of whitespace is
/// empty; any other name is returned exactly as supplied.
pub fn validate_file_name(name: Option<&str>) -> Result<&str, ValidationError> {
    match name {
        None => Err(ValidationError::MissingName),
        Some(name) if name.trim().is_empty() => Err(ValidationError::EmptyName),
        Some(name) => Ok(name),
    }
}

/// Longest sanitized name embedded in a staging path, in bytes. Keeps the
/// whole staging file name well under the usual 255-byte `NAME_MAX`.
pub const MAX_PATH_NAME_BYTES: usize = 128;

/// Make a filename safe to embed in a local staging path.
/// Path separators, control characters and leading dots are replaced, and the
/// result is cut to [`MAX_PATH_NAME_BYTES`] on a character boundary.
pub fn sanitize_for_path(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let mut cleaned = cleaned.trim_start_matches('.');
    if cleaned.len() > MAX_PATH_NAME_BYTES {
        let mut end = MAX_PATH_NAME_BYTES;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned = &cleaned[..end];
    }
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
