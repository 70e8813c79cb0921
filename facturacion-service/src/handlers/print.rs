//! Printable invoice page.

use askama::Template;
use axum::{
    extract::{Path, State},
    response::Html,
};
use service_core::error::AppError;

use crate::config::BusinessConfig;
use crate::domain::format::{format_cop, format_quantity, invoice_number};
use crate::models::InvoiceDetail;
use crate::startup::AppState;

pub struct PrintLine {
    pub cantidad: String,
    pub descripcion: String,
    pub precio: String,
    pub subtotal: String,
}

#[derive(Template)]
#[template(path = "invoice_print.html")]
pub struct InvoicePrintTemplate {
    pub empresa: String,
    pub nit: String,
    pub direccion_empresa: String,
    pub telefono_empresa: String,
    pub numero: String,
    pub fecha: String,
    pub cliente: String,
    pub negocio: String,
    pub telefono: String,
    pub direccion: String,
    pub identificacion: String,
    pub lineas: Vec<PrintLine>,
    pub total: String,
    pub observaciones: String,
    pub terminos: String,
}

impl InvoicePrintTemplate {
    /// Money and quantities arrive formatted; missing text becomes empty.
    pub fn new(detail: &InvoiceDetail, business: &BusinessConfig) -> Self {
        let client = detail.cliente.as_ref();
        let text = |value: Option<&String>| value.cloned().unwrap_or_default();

        Self {
            empresa: business.name.clone(),
            nit: business.nit.clone(),
            direccion_empresa: business.address.clone(),
            telefono_empresa: business.phone.clone(),
            numero: invoice_number(detail.invoice.id),
            fecha: detail.invoice.fecha.format("%d/%m/%Y %H:%M").to_string(),
            cliente: client.map(|c| c.cliente.clone()).unwrap_or_default(),
            negocio: text(client.and_then(|c| c.negocio.as_ref())),
            telefono: text(client.and_then(|c| c.telefono.as_ref())),
            direccion: text(client.and_then(|c| c.direccion.as_ref())),
            identificacion: text(client.and_then(|c| c.identificacion.as_ref())),
            lineas: detail
                .items
                .iter()
                .map(|item| PrintLine {
                    cantidad: format_quantity(item.cantidad),
                    descripcion: item
                        .descripcion
                        .clone()
                        .unwrap_or_else(|| format!("Producto {}", item.producto_id)),
                    precio: format_cop(item.precio_unitario),
                    subtotal: format_cop(item.subtotal),
                })
                .collect(),
            total: format_cop(detail.invoice.total),
            observaciones: detail.invoice.observaciones.clone().unwrap_or_default(),
            terminos: business.terms.clone(),
        }
    }
}

pub async fn print_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let detail = state.invoices.detail(id).await?;
    let page = InvoicePrintTemplate::new(&detail, &state.config.business)
        .render()
        .map_err(|e| AppError::TemplateError(e.to_string()))?;
    Ok(Html(page))
}
