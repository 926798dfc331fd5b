pub mod auth;
pub mod error;
pub mod extract;
pub mod items;
pub mod stats;

use axum::{
    Router,
    routing::{get, post, put},
};
use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// All registry routes, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/items/report-lost", post(items::report_lost))
        .route("/api/items/report-found", post(items::report_found))
        .route("/api/items/search/type/{item_type}", get(items::search_by_type))
        .route(
            "/api/items/search/description/{keyword}",
            get(items::search_by_description),
        )
        .route("/api/items/all", get(items::list_all))
        .route("/api/items/lost", get(items::list_lost))
        .route("/api/items/found", get(items::list_found))
        .route("/api/items/resolve/{report_id}", put(items::resolve))
        .route("/api/stats", get(stats::get_stats))
        .route("/api/health", get(stats::health))
        .with_state(state)
}

/// Run blocking store work (SQLite, password hashing) off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}

/// A required text field: present and not blank.
pub(crate) fn require(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}
