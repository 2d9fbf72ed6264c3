use super::AppState;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{MusicSummary, SsotStatus};
use crate::ssot::ssot_status;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ssot/status", get(status))
        .route("/api/ssot/music/summary", get(music_summary))
        .route("/api/ssot/music/events", get(list_events))
        .route("/api/ssot/music/items", get(list_items))
        .route("/api/ssot/music/pending", get(list_pending))
        .route(
            "/api/ssot/music/items/:timeline_index/reason",
            patch(update_item_reason),
        )
        .route(
            "/api/ssot/music/pending/:pending_id/reason",
            patch(update_pending_reason),
        )
        .with_state(state)
}

/// Error payload shaped `{ ok: false, error }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::NotFound(_) => Self::not_found(),
            AppError::BadRequest(message) => Self::new(StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, message),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "ok": false, "error": self.message }))).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "lifeos",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn status(State(state): State<AppState>) -> Json<SsotStatus> {
    Json(ssot_status(&state.base_dir, &state.ssot_path))
}

/// Runs a store call on the blocking pool; rusqlite holds a `std` mutex.
async fn with_db<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || work(&db))
        .await
        .map_err(|error| AppError::Internal(format!("store task failed: {error}")))?
        .map_err(ApiError::from)
}

async fn music_summary(State(state): State<AppState>) -> Result<Json<MusicSummary>, ApiError> {
    Ok(Json(with_db(&state, |db| db.music_summary()).await?))
}

async fn list_events(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let events = with_db(&state, |db| db.list_events()).await?;
    Ok(Json(json!({ "ok": true, "events": events })))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = with_db(&state, |db| db.list_crown_items()).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

async fn list_pending(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pending = with_db(&state, |db| db.list_pending()).await?;
    Ok(Json(json!({ "ok": true, "pending": pending })))
}

async fn update_item_reason(
    State(state): State<AppState>,
    Path(raw_index): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let timeline_index = parse_timeline_index(&raw_index)
        .ok_or_else(|| AppError::BadRequest("invalid timelineIndex".to_string()))?;
    let reason = reason_from_body(&body);

    let item = with_db(&state, move |db| db.update_crown_item_reason(timeline_index, &reason))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("crown item {timeline_index}")))?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

async fn update_pending_reason(
    State(state): State<AppState>,
    Path(pending_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let reason = reason_from_body(&body);

    let lookup_id = pending_id.clone();
    let pending = with_db(&state, move |db| db.update_pending_reason(&lookup_id, &reason))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending {pending_id}")))?;
    Ok(Json(json!({ "ok": true, "pending": pending })))
}

/// Integer literals, plus whole numbers written as floats (`1.0`, `1e0`).
fn parse_timeline_index(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|value| {
                value.is_finite()
                    && value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64
            })
            .map(|value| value as i64)
    })
}

/// Non-JSON bodies and non-string reasons both clear the field.
fn reason_from_body(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|payload| payload.get("reason").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ApiError::from(AppError::Unauthorized(
            "invalid or missing bearer token".to_string(),
        )))
    }
}
