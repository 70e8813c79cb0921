//! Storage seams. One implementation per backend, chosen at startup and
//! shared behind an `Arc<dyn ...>`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use service_core::error::AppError;
use uuid::Uuid;

use crate::domain::SearchTerm;
use crate::models::{
    AuthToken, Client, CreateClient, CreateProduct, HistoryRecord, Invoice, InvoiceDetail,
    InvoiceSummary, NewInvoice, NewUser, Product, TokenKind, UpdateClient, UpdateProduct, User,
};

/// Catalogs and invoices.
///
/// Reads return `Ok(None)`/`Ok(vec![])` only when the data is genuinely
/// absent; backend failures are errors.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn list_clients(&self) -> Result<Vec<Client>, AppError>;
    async fn get_client(&self, id: i64) -> Result<Option<Client>, AppError>;
    async fn search_clients(&self, term: &SearchTerm) -> Result<Vec<Client>, AppError>;
    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError>;
    async fn update_client(&self, id: i64, input: &UpdateClient) -> Result<Option<Client>, AppError>;
    async fn delete_client(&self, id: i64) -> Result<bool, AppError>;

    async fn list_products(&self) -> Result<Vec<Product>, AppError>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError>;
    async fn search_products(&self, term: &SearchTerm) -> Result<Vec<Product>, AppError>;
    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError>;
    async fn update_product(
        &self,
        id: i64,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError>;
    async fn delete_product(&self, id: i64) -> Result<bool, AppError>;

    /// All invoices with their client names, newest id first.
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, AppError>;
    /// Invoices dated within `[from, to]`, newest id first.
    async fn list_invoices_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<InvoiceSummary>, AppError>;
    async fn get_invoice_detail(&self, id: i64) -> Result<Option<InvoiceDetail>, AppError>;
    async fn last_invoice_id(&self) -> Result<Option<i64>, AppError>;
    async fn get_history(&self, factura_id: i64) -> Result<Option<HistoryRecord>, AppError>;

    /// Write header, lines and history atomically.
    async fn insert_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError>;
    /// Replace header fields, all lines and the history record atomically.
    /// `Ok(None)` when the invoice does not exist.
    async fn replace_invoice(&self, id: i64, input: &NewInvoice)
        -> Result<Option<Invoice>, AppError>;
}

/// Accounts and one-time e-mail tokens.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `AppError::Conflict` when the e-mail is taken.
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError>;
    /// Remove and return the token if it exists with the given kind.
    async fn take_token(&self, token: &str, kind: TokenKind)
        -> Result<Option<AuthToken>, AppError>;
}
