use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{DraftView, PriceSelection};
use crate::models::Invoice;

#[derive(Debug, Deserialize)]
pub struct SelectClientRequest {
    /// `None` clears the selection.
    pub cliente_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ObservacionesRequest {
    #[validate(length(max = 500, message = "Observaciones cannot exceed 500 characters"))]
    pub observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub producto_id: i64,
}

/// Both changes are applied together or not at all.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub cantidad: Option<Decimal>,
    pub precio: Option<PriceSelection>,
}

#[derive(Debug, Serialize)]
pub struct Suggestions<T> {
    pub ticket: u64,
    /// A newer search was issued while this one ran; `results` is empty.
    pub stale: bool,
    pub results: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct SavedDraft {
    pub invoice: Invoice,
    pub numero: String,
    /// Blank draft ready for the next invoice; `None` after saving an edit.
    pub draft: Option<DraftView>,
}
