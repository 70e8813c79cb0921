//! Domain models for facturacion-service.

mod client;
mod invoice;
mod product;
mod user;

pub use client::{Client, CreateClient, UpdateClient};
pub use invoice::{
    HistoryRecord, Invoice, InvoiceDetail, InvoiceDetailItem, InvoiceItem, InvoiceSummary,
    NewInvoice, NewInvoiceItem,
};
pub use product::{CreateProduct, Product, UpdateProduct};
pub use user::{AuthToken, NewUser, TokenKind, User, UserProfile};

use serde::{Deserialize, Deserializer};

/// Clearable field of a partial update: absent keeps the stored value,
/// `null` clears it, anything else replaces it.
pub(crate) fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
