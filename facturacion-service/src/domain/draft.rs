//! Invoice drafts: the client and line items a user is composing before save.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::line_items::{checked_sum, LineItem, LineItemError, LineItemList, ListMode};
use super::suggestions::SuggestionGuard;
use crate::models::{Client, InvoiceDetail, NewInvoice, NewInvoiceItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Select a client before saving the invoice")]
    MissingClient,

    #[error("Add at least one product before saving the invoice")]
    NoItems,
}

impl DraftError {
    pub fn reason(&self) -> &'static str {
        match self {
            DraftError::MissingClient => "missing_client",
            DraftError::NoItems => "no_items",
        }
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::UnprocessableEntity(err.into())
    }
}

/// Validated invoice content, ready to be stamped with a date and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSubmission {
    pub cliente_id: i64,
    pub cantidad: Decimal,
    pub total: Decimal,
    pub observaciones: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

impl InvoiceSubmission {
    /// Check the save preconditions and snapshot the list.
    pub fn from_parts(
        cliente: Option<&Client>,
        items: &LineItemList,
        observaciones: Option<&str>,
    ) -> Result<Self, DraftError> {
        let cliente = cliente.ok_or(DraftError::MissingClient)?;
        if items.is_empty() {
            return Err(DraftError::NoItems);
        }

        Ok(Self {
            cliente_id: cliente.id,
            cantidad: items.quantity_sum(),
            total: items.total(),
            observaciones: observaciones
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            items: items
                .items()
                .iter()
                .map(|item| NewInvoiceItem {
                    producto_id: item.producto_id,
                    cantidad: item.cantidad,
                    precio_unitario: item.precio,
                    subtotal: item.subtotal,
                })
                .collect(),
        })
    }

    /// Header, lines and history content for storage. No taxes: subtotal equals total.
    pub fn stamped(self, fecha: NaiveDateTime) -> NewInvoice {
        NewInvoice {
            cliente_id: self.cliente_id,
            fecha,
            cantidad: self.cantidad,
            subtotal: self.total,
            total: self.total,
            observaciones: self.observaciones,
            items: self.items,
        }
    }
}

/// Persisted invoice rebuilt into editable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableInvoice {
    pub factura_id: i64,
    pub cliente: Option<Client>,
    pub items: Vec<LineItem>,
    pub observaciones: Option<String>,
    pub total: Decimal,
}

impl EditableInvoice {
    /// Lines whose product was deleted get a `Producto {id}` description and
    /// the persisted unit price as both tiers.
    pub fn from_detail(detail: &InvoiceDetail) -> Result<Self, LineItemError> {
        let items = detail
            .items
            .iter()
            .map(|row| match &row.descripcion {
                Some(descripcion) => LineItem::restored(
                    row.producto_id,
                    descripcion.clone(),
                    row.precio_unitario,
                    row.cantidad,
                    row.precio_venta.unwrap_or(row.precio_unitario),
                    row.precio_venta2,
                ),
                None => {
                    tracing::warn!(
                        factura_id = detail.invoice.id,
                        producto_id = row.producto_id,
                        "Invoiced product no longer exists, using placeholder"
                    );
                    LineItem::restored(
                        row.producto_id,
                        format!("Producto {}", row.producto_id),
                        row.precio_unitario,
                        row.cantidad,
                        row.precio_unitario,
                        Some(row.precio_unitario),
                    )
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total = checked_sum(items.iter().map(|item| item.subtotal))?;

        Ok(Self {
            factura_id: detail.invoice.id,
            cliente: detail.cliente.clone(),
            items,
            observaciones: detail.invoice.observaciones.clone(),
            total,
        })
    }
}

/// Server-held form state for one invoice being created or edited.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub id: Uuid,
    /// Subject of the session that opened the draft.
    pub owner: String,
    /// Invoice being edited, `None` for a new invoice.
    pub factura_id: Option<i64>,
    pub cliente: Option<Client>,
    pub items: LineItemList,
    pub observaciones: Option<String>,
    pub suggestions: SuggestionGuard,
    pub updated_utc: DateTime<Utc>,
}

impl InvoiceDraft {
    pub fn new(owner: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            factura_id: None,
            cliente: None,
            items: LineItemList::new(ListMode::Create),
            observaciones: None,
            suggestions: SuggestionGuard::default(),
            updated_utc: Utc::now(),
        }
    }

    pub fn for_invoice(owner: &str, editable: EditableInvoice) -> Result<Self, LineItemError> {
        Ok(Self {
            factura_id: Some(editable.factura_id),
            cliente: editable.cliente,
            items: LineItemList::from_items(ListMode::Edit, editable.items)?,
            observaciones: editable.observaciones,
            ..Self::new(owner)
        })
    }

    pub fn mode(&self) -> ListMode {
        self.items.mode()
    }

    pub fn submission(&self) -> Result<InvoiceSubmission, DraftError> {
        InvoiceSubmission::from_parts(
            self.cliente.as_ref(),
            &self.items,
            self.observaciones.as_deref(),
        )
    }

    /// Blank the form after a new invoice was stored.
    pub fn reset(&mut self) {
        self.cliente = None;
        self.items.clear();
        self.observaciones = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_utc = Utc::now();
    }
}

/// Draft as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub id: Uuid,
    pub mode: ListMode,
    pub factura_id: Option<i64>,
    pub cliente: Option<Client>,
    pub items: Vec<LineItem>,
    pub cantidad: Decimal,
    pub total: Decimal,
    pub observaciones: Option<String>,
}

impl From<&InvoiceDraft> for DraftView {
    fn from(draft: &InvoiceDraft) -> Self {
        Self {
            id: draft.id,
            mode: draft.mode(),
            factura_id: draft.factura_id,
            cliente: draft.cliente.clone(),
            items: draft.items.items().to_vec(),
            cantidad: draft.items.quantity_sum(),
            total: draft.items.total(),
            observaciones: draft.observaciones.clone(),
        }
    }
}
