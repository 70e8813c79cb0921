use axum::{extract::State, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::middleware::AuthUser;
use crate::startup::AppState;

/// Landing data after sign-in: who is signed in and catalog sizes.
pub async fn home(State(state): State<AppState>, user: AuthUser) -> Result<Json<Value>, AppError> {
    let profile = state.auth.current_user(&user.0).await?;
    let clients = state.catalog.list_clients().await?.len();
    let products = state.catalog.list_products().await?.len();
    let next = state.invoices.next_invoice_number().await?;

    Ok(Json(json!({
        "user": profile,
        "clientes": clients,
        "productos": products,
        "siguiente_factura": next.numero,
    })))
}
