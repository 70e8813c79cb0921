use axum::{extract::State, Json};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::invoices::DailySummary;
use crate::startup::AppState;

/// Today's invoices in the business time zone.
pub async fn today(State(state): State<AppState>) -> Result<Json<DailySummary>, AppError> {
    Ok(Json(state.invoices.daily_summary(Utc::now()).await?))
}
