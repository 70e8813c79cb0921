use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::PriceSelection;
use crate::models::InvoiceSummary;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceItemRequest {
    pub producto_id: i64,
    pub cantidad: Decimal,
    /// Primary price when absent.
    pub precio: Option<PriceSelection>,
}

/// Invoice submitted in one request instead of through a draft.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InvoiceRequest {
    pub cliente_id: i64,
    pub items: Vec<InvoiceItemRequest>,
    #[validate(length(max = 500, message = "Observaciones cannot exceed 500 characters"))]
    pub observaciones: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NextInvoiceNumber {
    pub id: i64,
    pub numero: String,
}

/// Invoices of one business day.
#[derive(Debug, Serialize)]
pub struct DailySummary {
    pub fecha: NaiveDate,
    pub count: usize,
    pub total: Decimal,
    pub facturas: Vec<InvoiceSummary>,
}
