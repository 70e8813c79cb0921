use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::domain::{EditableInvoice, Page};
use crate::dtos::invoices::{InvoiceRequest, NextInvoiceNumber};
use crate::dtos::listing::ListQuery;
use crate::middleware::AuthUser;
use crate::models::{Invoice, InvoiceDetail, InvoiceSummary};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn next_number(
    State(state): State<AppState>,
) -> Result<Json<NextInvoiceNumber>, AppError> {
    Ok(Json(state.invoices.next_invoice_number().await?))
}

/// Invoice history: search, inclusive date range and paging over all rows.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<InvoiceSummary>>, AppError> {
    let mut view = query.view()?;
    let history = state.invoices.list_history().await?;
    Ok(Json(view.present(history)))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<InvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.invoices.create_from_request(req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(state.invoices.detail(id).await?))
}

pub async fn replace_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<InvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.invoices.replace_from_request(id, req).await?))
}

pub async fn editable_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EditableInvoice>, AppError> {
    Ok(Json(state.invoices.editable(id).await?))
}

/// Open a stored invoice in an edit-mode draft.
pub async fn open_invoice_draft(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state.drafts.open_for_edit(&user.0.sub, id).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}
