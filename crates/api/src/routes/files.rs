use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use fileserver_core::staging::StagedFile;
use fileserver_core::{Document, FileId, ServiceError};
use futures::{Stream, TryStreamExt};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart form field carrying the upload.
const FILE_FIELD: &str = "file";

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route(
            "/file",
            post(upload_file).layer(DefaultBodyLimit::max(state.upload_body_limit())),
        )
        .route("/file/{id_file}", get(get_file).delete(delete_file))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    search_query: Option<String>,
}

fn parse_file_id(raw: &str) -> ApiResult<FileId> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Error parsing the idFile: {e}")))
}

/// `GET /files?searchQuery=` lists active documents, optionally filtered by name.
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Document>>> {
    let documents = state
        .documents()
        .list(query.search_query.as_deref())
        .await?;
    Ok(Json(documents))
}

/// `GET /file/{idFile}` streams the stored bytes back as an attachment.
async fn get_file(
    State(state): State<AppState>,
    Path(id_file): Path<String>,
) -> ApiResult<Response> {
    let file_id = parse_file_id(&id_file)?;
    let file = state.documents().retrieve(file_id).await?;

    let reader = file
        .staged
        .reader()
        .await
        .map_err(|e| ApiError::Internal(format!("failed to open staged file: {e}")))?;

    let body = StagedStream {
        chunks: ReaderStream::new(reader),
        _staged: file.staged,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.document.file_id),
        )
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, file.size)
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
}

/// Response body over a staged download. The staged copy lives until the
/// body is dropped.
struct StagedStream {
    chunks: ReaderStream<File>,
    _staged: StagedFile,
}

impl Stream for StagedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().chunks).poll_next(cx)
    }
}

/// `POST /file` with multipart field `file`.
async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<String> {
    let limit = state.documents().settings().max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from(multipart_error(e, limit)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let body = field.map_err(move |e| multipart_error(e, limit));
        let document = state.documents().upload(&name, body).await?;

        return Ok(format!(
            "File {} uploaded successfully! (id: {})\n",
            document.name, document.file_id
        ));
    }

    Err(ApiError::BadRequest(format!(
        "multipart field `{FILE_FIELD}` is required"
    )))
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: u64) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::TooLarge { limit }
    } else {
        ServiceError::Malformed(err.body_text())
    }
}

/// `DELETE /file/{idFile}` soft-deletes the document.
async fn delete_file(
    State(state): State<AppState>,
    Path(id_file): Path<String>,
) -> ApiResult<String> {
    let file_id = parse_file_id(&id_file)?;
    state.documents().delete(file_id).await?;
    Ok(format!("File with ID {file_id} deleted successfully"))
}
