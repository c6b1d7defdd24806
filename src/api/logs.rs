//! `/logs` resource

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Deserialize;

use crate::models::{DataLog, DataLogCreate, LogLevel, RecordId};

use super::extract::{Json, Path, Query};
use super::{ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/:id", get(get_log).delete(delete_log))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLogsQuery {
    pub level: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// List logs, optionally filtered by level
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<Vec<DataLog>>, ApiError> {
    let page = state.page(query.offset, query.limit)?;
    let level = query
        .level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()?;

    let logs = state.logs.list(level, page).await?;
    Ok(Json(logs))
}

pub async fn create_log(
    State(state): State<AppState>,
    Json(payload): Json<DataLogCreate>,
) -> Result<(StatusCode, Json<DataLog>), ApiError> {
    let log = state.logs.create(payload).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<DataLog>, ApiError> {
    Ok(Json(state.logs.get(id).await?))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, ApiError> {
    state.logs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
