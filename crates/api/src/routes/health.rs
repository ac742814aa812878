use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const WELCOME: &str = "Welcome to my homepage";

/// Liveness routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
}

async fn welcome() -> &'static str {
    WELCOME
}

/// Verifies the metadata store is reachable.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .documents()
        .check_metadata_store()
        .await
        .map_err(|e| ApiError::Internal(format!("database health check failed: {e}")))?;

    Ok(Json(json!({
        "status": "ok",
        "database": "connected",
    })))
}
