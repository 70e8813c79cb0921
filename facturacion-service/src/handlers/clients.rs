use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::domain::Page;
use crate::dtos::listing::{ListQuery, SearchQuery};
use crate::models::{Client, CreateClient, UpdateClient};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// Client catalog screen: filtered and paged in memory.
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Client>>, AppError> {
    let mut view = query.view()?;
    let clients = state.catalog.list_clients().await?;
    Ok(Json(view.present(clients)))
}

pub async fn search_clients(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(state.catalog.search_clients(&query.q).await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(state.catalog.get_client(id).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateClient>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.catalog.create_client(req).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateClient>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(state.catalog.update_client(id, req).await?))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
