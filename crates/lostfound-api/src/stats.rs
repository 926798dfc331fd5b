use axum::{Json, extract::State, response::IntoResponse};

use lostfound_types::api::{MessageResponse, StatsResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = run_db(&state, |state| Ok(state.db.stats()?)).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(MessageResponse::ok("Server is running"))
}
