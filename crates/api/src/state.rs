use std::sync::Arc;

use fileserver_core::DocumentService;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    documents: DocumentService,
    upload_body_limit: usize,
}

impl AppState {
    pub fn new(documents: DocumentService) -> Self {
        let max_upload = documents.settings().max_upload_bytes;
        Self {
            inner: Arc::new(InnerState {
                documents,
                upload_body_limit: upload_body_limit(max_upload),
            }),
        }
    }

    pub fn documents(&self) -> &DocumentService {
        &self.inner.documents
    }

    /// Raw request body limit for uploads, including multipart framing.
    pub fn upload_body_limit(&self) -> usize {
        self.inner.upload_body_limit
    }
}

/// Slack on top of the file limit for multipart boundaries and part headers.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

fn upload_body_limit(max_upload: u64) -> usize {
    usize::try_from(max_upload.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX)
}
