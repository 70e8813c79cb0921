use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::domain::DraftView;
use crate::dtos::drafts::{
    AddItemRequest, ObservacionesRequest, SavedDraft, SelectClientRequest, Suggestions,
    UpdateItemRequest,
};
use crate::dtos::listing::SearchQuery;
use crate::middleware::AuthUser;
use crate::models::{Client, Product};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_draft(
    State(state): State<AppState>,
    user: AuthUser,
) -> impl IntoResponse {
    (StatusCode::CREATED, Json(state.drafts.create(&user.0.sub)))
}

pub async fn get_draft(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(state.drafts.get(&user.0.sub, id)?))
}

pub async fn discard_draft(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.drafts.discard(&user.0.sub, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectClientRequest>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(
        state
            .drafts
            .select_client(&user.0.sub, id, req.cliente_id)
            .await?,
    ))
}

pub async fn set_observaciones(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ObservacionesRequest>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(state.drafts.set_observaciones(
        &user.0.sub,
        id,
        req.observaciones,
    )?))
}

pub async fn client_suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Suggestions<Client>>, AppError> {
    Ok(Json(
        state
            .drafts
            .client_suggestions(&user.0.sub, id, &query.q)
            .await?,
    ))
}

pub async fn product_suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Suggestions<Product>>, AppError> {
    Ok(Json(
        state
            .drafts
            .product_suggestions(&user.0.sub, id, &query.q)
            .await?,
    ))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(
        state
            .drafts
            .add_item(&user.0.sub, id, req.producto_id)
            .await?,
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(state.drafts.update_item(&user.0.sub, id, index, req)?))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<DraftView>, AppError> {
    Ok(Json(state.drafts.remove_item(&user.0.sub, id, index)?))
}

pub async fn save_draft(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SavedDraft>), AppError> {
    let saved = state.drafts.save(&user.0.sub, id).await?;
    // Edits update an existing invoice
    let status = if saved.draft.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved)))
}
