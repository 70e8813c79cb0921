//! Invoice persistence workflow: numbering, create, replace, history and the
//! daily summary.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::domain::format::invoice_number;
use crate::domain::{
    BusinessClock, EditableInvoice, InvoiceSubmission, LineItemList, ListMode,
};
use crate::dtos::invoices::{DailySummary, InvoiceRequest, NextInvoiceNumber};
use crate::models::{Invoice, InvoiceDetail, InvoiceSummary};
use crate::services::metrics::{
    record_error, rejection, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL,
};
use crate::services::storage::Storage;

#[derive(Clone)]
pub struct InvoiceService {
    storage: Arc<dyn Storage>,
    clock: BusinessClock,
}

fn invoice_not_found(id: i64) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invoice {} not found", id))
}

impl InvoiceService {
    pub fn new(storage: Arc<dyn Storage>, clock: BusinessClock) -> Self {
        Self { storage, clock }
    }

    pub fn clock(&self) -> BusinessClock {
        self.clock
    }

    /// Number the next invoice will most likely get: last id + 1.
    pub async fn next_invoice_number(&self) -> Result<NextInvoiceNumber, AppError> {
        let id = self.storage.last_invoice_id().await?.unwrap_or(0) + 1;
        Ok(NextInvoiceNumber {
            id,
            numero: invoice_number(id),
        })
    }

    pub async fn list_history(&self) -> Result<Vec<InvoiceSummary>, AppError> {
        self.storage.list_invoices().await
    }

    pub async fn detail(&self, id: i64) -> Result<InvoiceDetail, AppError> {
        self.storage
            .get_invoice_detail(id)
            .await?
            .ok_or_else(|| invoice_not_found(id))
    }

    pub async fn editable(&self, id: i64) -> Result<EditableInvoice, AppError> {
        let detail = self.detail(id).await?;
        Ok(EditableInvoice::from_detail(&detail)?)
    }

    /// Store a new invoice dated now. Header, lines and history are written
    /// together or not at all.
    #[instrument(skip(self, submission), fields(cliente_id = submission.cliente_id))]
    pub async fn create(&self, submission: InvoiceSubmission) -> Result<Invoice, AppError> {
        let new_invoice = submission.stamped(self.clock.now());

        let invoice = self
            .storage
            .insert_invoice(&new_invoice)
            .await
            .inspect_err(|e| {
                record_error(e);
                error!(error = %e, "Failed to store invoice");
            })?;

        INVOICES_TOTAL.with_label_values(&["create"]).inc();
        INVOICE_AMOUNT_TOTAL
            .with_label_values(&["create"])
            .inc_by(invoice.total.to_f64().unwrap_or_default());
        info!(
            factura_id = invoice.id,
            total = %invoice.total,
            items = new_invoice.items.len(),
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Overwrite an invoice's header, lines and history. The date moves to now.
    #[instrument(skip(self, submission), fields(cliente_id = submission.cliente_id))]
    pub async fn replace(
        &self,
        id: i64,
        submission: InvoiceSubmission,
    ) -> Result<Invoice, AppError> {
        let new_invoice = submission.stamped(self.clock.now());

        let invoice = self
            .storage
            .replace_invoice(id, &new_invoice)
            .await
            .inspect_err(|e| {
                record_error(e);
                error!(error = %e, factura_id = id, "Failed to replace invoice");
            })?
            .ok_or_else(|| invoice_not_found(id))?;

        INVOICES_TOTAL.with_label_values(&["replace"]).inc();
        INVOICE_AMOUNT_TOTAL
            .with_label_values(&["replace"])
            .inc_by(invoice.total.to_f64().unwrap_or_default());
        info!(
            factura_id = id,
            total = %invoice.total,
            items = new_invoice.items.len(),
            "Invoice replaced"
        );

        Ok(invoice)
    }

    pub async fn create_from_request(&self, req: InvoiceRequest) -> Result<Invoice, AppError> {
        let submission = self.submission_from_request(ListMode::Create, &req).await?;
        self.create(submission).await
    }

    pub async fn replace_from_request(
        &self,
        id: i64,
        req: InvoiceRequest,
    ) -> Result<Invoice, AppError> {
        self.detail(id).await?;
        let submission = self.submission_from_request(ListMode::Edit, &req).await?;
        self.replace(id, submission).await
    }

    /// Run the request's lines through the same rules as a draft.
    async fn submission_from_request(
        &self,
        mode: ListMode,
        req: &InvoiceRequest,
    ) -> Result<InvoiceSubmission, AppError> {
        let client = self
            .storage
            .get_client(req.cliente_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Client {} not found", req.cliente_id))
            })?;

        let mut list = LineItemList::new(mode);
        for item in &req.items {
            let product = self
                .storage
                .get_product(item.producto_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("Product {} not found", item.producto_id))
                })?;

            list.add_product(&product)
                .map_err(|e| rejection(e.reason(), e))?;
            let index = list.len() - 1;
            list.update_quantity(index, item.cantidad)
                .map_err(|e| rejection(e.reason(), e))?;
            if let Some(precio) = item.precio {
                list.update_price(index, precio)
                    .map_err(|e| rejection(e.reason(), e))?;
            }
        }

        InvoiceSubmission::from_parts(Some(&client), &list, req.observaciones.as_deref())
            .map_err(|e| rejection(e.reason(), e))
    }

    /// Invoices dated within the business day containing `now`, newest first.
    pub async fn daily_summary(&self, now: DateTime<Utc>) -> Result<DailySummary, AppError> {
        let fecha = self.clock.today_at(now);
        let (from, to) = BusinessClock::day_range(fecha);

        let facturas = self.storage.list_invoices_between(from, to).await?;
        let total = facturas.iter().map(|f| f.total).sum();

        Ok(DailySummary {
            fecha,
            count: facturas.len(),
            total,
            facturas,
        })
    }
}
