use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::domain::Page;
use crate::dtos::listing::{ListQuery, SearchQuery};
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Product>>, AppError> {
    let mut view = query.view()?;
    let products = state.catalog.list_products().await?;
    Ok(Json(view.present(products)))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog.search_products(&query.q).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog.get_product(id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateProduct>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog.update_product(id, req).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
