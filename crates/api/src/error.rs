use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fileserver_core::ServiceError;
use serde_json::json;

/// API error type rendered as a JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(_) | ServiceError::Malformed(_) | ServiceError::TooLarge { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            ServiceError::Duplicate { .. } => ApiError::Conflict("Document already exists.".to_string()),
            ServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ServiceError::Staging(_) | ServiceError::Storage(_) | ServiceError::Metadata(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fileserver_core::store::ObjectStoreError;
    use fileserver_core::FileId;

    fn status(err: ServiceError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_taxonomy() {
        assert_eq!(status(ServiceError::Malformed("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::TooLarge { limit: 1 }), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ServiceError::Duplicate { fingerprint: "f".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(ServiceError::NotFound(FileId::generate())), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ServiceError::Storage(ObjectStoreError::Backend("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ServiceError::Staging(std::io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
