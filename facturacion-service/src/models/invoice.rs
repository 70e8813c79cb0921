//! Invoice model for facturacion-service.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Client;

/// Invoice header. `fecha` is wall-clock time in the business time zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub cliente_id: i64,
    pub fecha: NaiveDateTime,
    /// Sum of item quantities.
    pub cantidad: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub observaciones: Option<String>,
}

/// Persisted invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub id: i64,
    pub factura_id: i64,
    pub producto_id: i64,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

/// Denormalized copy of an invoice's totals kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistoryRecord {
    pub factura_id: i64,
    pub cliente_id: i64,
    pub total: Decimal,
    pub fecha: NaiveDateTime,
    pub observaciones: Option<String>,
}

/// Line to write for a new or replaced invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoiceItem {
    pub producto_id: i64,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

/// Complete invoice to write: header, lines and history in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub cliente_id: i64,
    pub fecha: NaiveDateTime,
    pub cantidad: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub observaciones: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

/// Row of the invoice history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InvoiceSummary {
    pub id: i64,
    pub fecha: NaiveDateTime,
    pub total: Decimal,
    pub cliente_id: i64,
    pub cliente: Option<String>,
    pub negocio: Option<String>,
}

/// Invoice line joined with its product, if the product still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InvoiceDetailItem {
    pub producto_id: i64,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
    pub descripcion: Option<String>,
    pub precio_venta: Option<Decimal>,
    pub precio_venta2: Option<Decimal>,
}

/// Invoice with its client and lines, as shown on the detail and print views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub cliente: Option<Client>,
    pub items: Vec<InvoiceDetailItem>,
}

impl NewInvoice {
    pub fn history(&self, factura_id: i64) -> HistoryRecord {
        HistoryRecord {
            factura_id,
            cliente_id: self.cliente_id,
            total: self.total,
            fecha: self.fecha,
            observaciones: self.observaciones.clone(),
        }
    }
}
