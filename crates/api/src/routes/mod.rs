pub mod files;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Registered endpoint, for the startup log.
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub handler: &'static str,
}

pub const ROUTES: &[RouteInfo] = &[
    RouteInfo { method: "GET", path: "/", handler: "health::welcome" },
    RouteInfo { method: "GET", path: "/health", handler: "health::health_check" },
    RouteInfo { method: "GET", path: "/files", handler: "files::list_files" },
    RouteInfo { method: "POST", path: "/file", handler: "files::upload_file" },
    RouteInfo { method: "GET", path: "/file/{idFile}", handler: "files::get_file" },
    RouteInfo { method: "DELETE", path: "/file/{idFile}", handler: "files::delete_file" },
];

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(files::routes(&state))
        .with_state(state)
}

pub fn log_routes() {
    for route in ROUTES {
        tracing::info!(
            method = route.method,
            path = route.path,
            handler = route.handler,
            "Registered route"
        );
    }
}

#[cfg(test)]
mod tests;
