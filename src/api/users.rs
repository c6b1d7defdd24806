//! `/users` resource

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Deserialize;

use crate::models::{RecordId, User, UserCreate};

use super::extract::{Json, Path, Query};
use super::{ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let page = state.page(query.offset, query.limit)?;
    Ok(Json(state.users.list(page).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get(id).await?))
}
