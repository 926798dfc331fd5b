use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use lostfound_db::ResolveOutcome;
use lostfound_db::models::{ItemRow, NewItem};
use lostfound_types::api::{
    ItemsResponse, MessageResponse, ReportItemRequest, ReportItemResponse, ResolveRequest,
};
use lostfound_types::models::{Item, ItemKind, ItemStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{require, run_db};

/// Upper bound on candidate matches returned with a new report.
pub const MAX_CANDIDATES: u32 = 5;

pub async fn report_lost(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReportItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    report(state, ItemKind::Lost, req).await
}

pub async fn report_found(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReportItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    report(state, ItemKind::Found, req).await
}

async fn report(
    state: AppState,
    kind: ItemKind,
    req: ReportItemRequest,
) -> Result<Json<ReportItemResponse>, ApiError> {
    const MISSING: &str = "All fields are required";
    let item_type = require(req.item_type, MISSING)?;
    let description = require(req.description, MISSING)?;
    let reporter_name = require(req.name, MISSING)?;
    let phone_number = require(req.phone, MISSING)?;
    let user_id = req
        .user_id
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation(MISSING.into()))?;

    let report_id = Uuid::new_v4().to_string();

    let rid = report_id.clone();
    let (item_id, matches) = run_db(&state, move |state| {
        if !state.db.user_exists(user_id)? {
            return Err(ApiError::Validation("Unknown user".into()));
        }

        let item_id = state.db.insert_item(&NewItem {
            item_type: &item_type,
            description: &description,
            reporter_name: &reporter_name,
            phone_number: &phone_number,
            is_found: kind.is_found(),
            report_id: &rid,
            user_id,
        })?;

        let matches = state
            .db
            .find_candidates(&item_type, kind.opposite(), MAX_CANDIDATES)?;

        Ok((item_id, matches))
    })
    .await?;

    let label = match kind {
        ItemKind::Lost => "Lost",
        ItemKind::Found => "Found",
    };
    info!(
        "{} report {} by user {} ({} candidate matches)",
        label,
        report_id,
        user_id,
        matches.len()
    );

    Ok(Json(ReportItemResponse {
        success: true,
        report_id,
        item_id,
        message: format!("{label} item reported successfully"),
        matches: matches.into_iter().map(to_item).collect(),
    }))
}

pub async fn search_by_type(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |state| Ok(state.db.search_by_type(&item_type)?)).await?;
    Ok(items_response(rows))
}

pub async fn search_by_description(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |state| Ok(state.db.search_by_description(&keyword)?)).await?;
    Ok(items_response(rows))
}

pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list(state, None).await
}

pub async fn list_lost(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list(state, Some(ItemKind::Lost)).await
}

pub async fn list_found(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list(state, Some(ItemKind::Found)).await
}

async fn list(state: AppState, kind: Option<ItemKind>) -> Result<Json<ItemsResponse>, ApiError> {
    let rows = run_db(&state, move |state| Ok(state.db.list_pending(kind)?)).await?;
    Ok(items_response(rows))
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    body: Result<ApiJson<ResolveRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    // An absent or unreadable body carries no user id either
    let user_id = body
        .ok()
        .and_then(|ApiJson(req)| req.user_id)
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation("User ID required".into()))?;

    let rid = report_id.clone();
    let outcome = run_db(&state, move |state| Ok(state.db.resolve_item(&rid, user_id)?)).await?;

    match outcome {
        ResolveOutcome::Resolved => {
            info!("Report {} resolved by user {}", report_id, user_id);
            Ok(Json(MessageResponse::ok("Item resolved successfully")))
        }
        ResolveOutcome::NotOwner => {
            warn!("User {} tried to resolve report {} they do not own", user_id, report_id);
            Err(ApiError::Forbidden)
        }
        ResolveOutcome::NotFound => Err(ApiError::NotFound),
    }
}

fn items_response(rows: Vec<ItemRow>) -> Json<ItemsResponse> {
    Json(ItemsResponse {
        success: true,
        items: rows.into_iter().map(to_item).collect(),
    })
}

fn to_item(row: ItemRow) -> Item {
    let status = row.status.parse().unwrap_or_else(|e| {
        warn!("Corrupt status on report '{}': {}", row.report_id, e);
        ItemStatus::Pending
    });
    let created_at = parse_timestamp(&row.created_at, &row.report_id);
    let updated_at = parse_timestamp(&row.updated_at, &row.report_id);

    Item {
        id: row.id,
        item_type: row.item_type,
        description: row.description,
        reporter_name: row.reporter_name,
        phone_number: row.phone_number,
        is_found: row.is_found,
        report_id: row.report_id,
        status,
        user_id: row.user_id,
        created_at,
        updated_at,
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" in UTC without a zone.
fn parse_timestamp(raw: &str, report_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on report '{}': {}", raw, report_id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2024-03-05 14:07:09", "r");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 7, 9));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "r"), DateTime::<Utc>::default());
    }
}
