//! In-process storage. Backs the integration tests and `DATABASE_URL=memory://`.
//!
//! All data sits behind one lock, so every multi-table write is applied
//! entirely or not at all.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::search::SEARCH_LIMIT;
use crate::domain::SearchTerm;
use crate::models::{
    AuthToken, Client, CreateClient, CreateProduct, HistoryRecord, Invoice, InvoiceDetail,
    InvoiceDetailItem, InvoiceItem, InvoiceSummary, NewInvoice, NewUser, Product, TokenKind,
    UpdateClient, UpdateProduct, User,
};
use crate::services::storage::{Storage, UserStore};

#[derive(Default)]
struct State {
    clients: BTreeMap<i64, Client>,
    products: BTreeMap<i64, Product>,
    invoices: BTreeMap<i64, Invoice>,
    items: Vec<InvoiceItem>,
    history: Vec<HistoryRecord>,
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, AuthToken>,
    client_seq: i64,
    product_seq: i64,
    invoice_seq: i64,
    item_seq: i64,
}

impl State {
    fn summary(&self, invoice: &Invoice) -> InvoiceSummary {
        let client = self.clients.get(&invoice.cliente_id);
        InvoiceSummary {
            id: invoice.id,
            fecha: invoice.fecha,
            total: invoice.total,
            cliente_id: invoice.cliente_id,
            cliente: client.map(|c| c.cliente.clone()),
            negocio: client.and_then(|c| c.negocio.clone()),
        }
    }

    fn push_items(&mut self, factura_id: i64, input: &NewInvoice) {
        for item in &input.items {
            self.item_seq += 1;
            self.items.push(InvoiceItem {
                id: self.item_seq,
                factura_id,
                producto_id: item.producto_id,
                cantidad: item.cantidad,
                precio_unitario: item.precio_unitario,
                subtotal: item.subtotal,
            });
        }
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, AppError> {
        self.state
            .read()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, AppError> {
        self.state
            .write()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to acquire write lock: {}", e)))
    }

    /// Persisted lines of an invoice, in insertion order.
    pub fn invoice_items(&self, factura_id: i64) -> Result<Vec<InvoiceItem>, AppError> {
        Ok(self
            .read()?
            .items
            .iter()
            .filter(|item| item.factura_id == factura_id)
            .cloned()
            .collect())
    }

    /// Number of history records stored for an invoice.
    pub fn history_count(&self, factura_id: i64) -> Result<usize, AppError> {
        Ok(self
            .read()?
            .history
            .iter()
            .filter(|h| h.factura_id == factura_id)
            .count())
    }

    /// Store an invoice with an explicit date, bypassing the service clock.
    pub fn seed_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        self.insert(input)
    }

    /// Drop the history record of an invoice.
    pub fn remove_history(&self, factura_id: i64) -> Result<(), AppError> {
        self.write()?.history.retain(|h| h.factura_id != factura_id);
        Ok(())
    }

    fn insert(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        let mut state = self.write()?;
        if !state.clients.contains_key(&input.cliente_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                input.cliente_id
            )));
        }

        state.invoice_seq += 1;
        let invoice = Invoice {
            id: state.invoice_seq,
            cliente_id: input.cliente_id,
            fecha: input.fecha,
            cantidad: input.cantidad,
            subtotal: input.subtotal,
            total: input.total,
            observaciones: input.observaciones.clone(),
        };
        state.invoices.insert(invoice.id, invoice.clone());
        state.push_items(invoice.id, input);
        state.history.push(input.history(invoice.id));

        Ok(invoice)
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn health_check(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        Ok(self.read()?.clients.values().cloned().collect())
    }

    async fn get_client(&self, id: i64) -> Result<Option<Client>, AppError> {
        Ok(self.read()?.clients.get(&id).cloned())
    }

    async fn search_clients(&self, term: &SearchTerm) -> Result<Vec<Client>, AppError> {
        Ok(self
            .read()?
            .clients
            .values()
            .filter(|c| {
                term.matches_text(&c.cliente)
                    || c.negocio.as_deref().map(|n| term.matches_text(n)).unwrap_or(false)
                    || c.id == term.id
            })
            .take(SEARCH_LIMIT as usize)
            .cloned()
            .collect())
    }

    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let mut state = self.write()?;
        state.client_seq += 1;
        let client = Client {
            id: state.client_seq,
            negocio: input.negocio.clone(),
            cliente: input.cliente.clone(),
            direccion: input.direccion.clone(),
            telefono: input.telefono.clone(),
            identificacion: input.identificacion.clone(),
        };
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(
        &self,
        id: i64,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let mut state = self.write()?;
        Ok(state.clients.get_mut(&id).map(|client| {
            input.apply_to(client);
            client.clone()
        }))
    }

    async fn delete_client(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.write()?;
        if state.invoices.values().any(|inv| inv.cliente_id == id) {
            return Err(AppError::Conflict(anyhow::anyhow!("Client {} has invoices", id)));
        }
        Ok(state.clients.remove(&id).is_some())
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn search_products(&self, term: &SearchTerm) -> Result<Vec<Product>, AppError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| term.matches_text(&p.descripcion) || p.id == term.id)
            .take(SEARCH_LIMIT as usize)
            .cloned()
            .collect())
    }

    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let mut state = self.write()?;
        state.product_seq += 1;
        let product = Product {
            id: state.product_seq,
            descripcion: input.descripcion.clone(),
            precio_venta: input.precio_venta,
            precio_venta2: input.precio_venta2,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let mut state = self.write()?;
        Ok(state.products.get_mut(&id).map(|product| {
            input.apply_to(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.write()?.products.remove(&id).is_some())
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, AppError> {
        let state = self.read()?;
        Ok(state
            .invoices
            .values()
            .rev()
            .map(|inv| state.summary(inv))
            .collect())
    }

    async fn list_invoices_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        let state = self.read()?;
        Ok(state
            .invoices
            .values()
            .rev()
            .filter(|inv| inv.fecha >= from && inv.fecha <= to)
            .map(|inv| state.summary(inv))
            .collect())
    }

    async fn get_invoice_detail(&self, id: i64) -> Result<Option<InvoiceDetail>, AppError> {
        let state = self.read()?;
        let Some(invoice) = state.invoices.get(&id).cloned() else {
            return Ok(None);
        };

        let items = state
            .items
            .iter()
            .filter(|item| item.factura_id == id)
            .map(|item| {
                let product = state.products.get(&item.producto_id);
                InvoiceDetailItem {
                    producto_id: item.producto_id,
                    cantidad: item.cantidad,
                    precio_unitario: item.precio_unitario,
                    subtotal: item.subtotal,
                    descripcion: product.map(|p| p.descripcion.clone()),
                    precio_venta: product.map(|p| p.precio_venta),
                    precio_venta2: product.and_then(|p| p.precio_venta2),
                }
            })
            .collect();

        Ok(Some(InvoiceDetail {
            cliente: state.clients.get(&invoice.cliente_id).cloned(),
            invoice,
            items,
        }))
    }

    async fn last_invoice_id(&self) -> Result<Option<i64>, AppError> {
        Ok(self.read()?.invoices.keys().next_back().copied())
    }

    async fn get_history(&self, factura_id: i64) -> Result<Option<HistoryRecord>, AppError> {
        Ok(self
            .read()?
            .history
            .iter()
            .rev()
            .find(|h| h.factura_id == factura_id)
            .cloned())
    }

    async fn insert_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        self.insert(input)
    }

    async fn replace_invoice(
        &self,
        id: i64,
        input: &NewInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let mut state = self.write()?;
        if !state.invoices.contains_key(&id) {
            return Ok(None);
        }
        if !state.clients.contains_key(&input.cliente_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                input.cliente_id
            )));
        }

        let invoice = Invoice {
            id,
            cliente_id: input.cliente_id,
            fecha: input.fecha,
            cantidad: input.cantidad,
            subtotal: input.subtotal,
            total: input.total,
            observaciones: input.observaciones.clone(),
        };
        state.invoices.insert(id, invoice.clone());

        state.items.retain(|item| item.factura_id != id);
        state.push_items(id, input);

        let history = input.history(id);
        match state.history.iter_mut().find(|h| h.factura_id == id) {
            Some(existing) => *existing = history,
            None => state.history.push(history),
        }

        Ok(Some(invoice))
    }
}

#[async_trait]
impl UserStore for InMemoryStorage {
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == input.email) {
            return Err(AppError::Conflict(anyhow::anyhow!("Email already registered")));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            nombres: input.nombres.clone(),
            apellidos: input.apellidos.clone(),
            verified: false,
            created_utc: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.write()?.users.get_mut(&id) {
            user.verified = true;
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        if let Some(user) = self.write()?.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError> {
        self.write()?
            .tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn take_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<AuthToken>, AppError> {
        let mut state = self.write()?;
        match state.tokens.get(token) {
            Some(stored) if stored.kind() == kind => Ok(state.tokens.remove(token)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoiceItem;
    use rust_decimal::Decimal;

    fn fecha(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn new_invoice(cliente_id: i64, items: &[(i64, i64, i64)]) -> NewInvoice {
        let items: Vec<NewInvoiceItem> = items
            .iter()
            .map(|&(producto_id, cantidad, precio)| NewInvoiceItem {
                producto_id,
                cantidad: Decimal::from(cantidad),
                precio_unitario: Decimal::from(precio),
                subtotal: Decimal::from(cantidad * precio),
            })
            .collect();
        let total = items.iter().map(|i| i.subtotal).sum();
        NewInvoice {
            cliente_id,
            fecha: fecha("2024-01-15T10:00:00"),
            cantidad: items.iter().map(|i| i.cantidad).sum(),
            subtotal: total,
            total,
            observaciones: None,
            items,
        }
    }

    async fn storage_with_client() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage
            .create_client(&CreateClient {
                negocio: Some("Tienda Don Pepe".to_string()),
                cliente: "José Pérez".to_string(),
                direccion: None,
                telefono: None,
                identificacion: None,
            })
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn insert_writes_header_lines_and_history() {
        let storage = storage_with_client().await;

        let invoice = storage
            .insert_invoice(&new_invoice(1, &[(1, 2, 1000), (2, 3, 500)]))
            .await
            .unwrap();

        assert_eq!(invoice.id, 1);
        assert_eq!(storage.invoice_items(1).unwrap().len(), 2);
        let history = storage.get_history(1).await.unwrap().unwrap();
        assert_eq!(history.total, Decimal::from(3500));
    }

    #[tokio::test]
    async fn insert_for_unknown_client_stores_nothing() {
        let storage = storage_with_client().await;

        let result = storage.insert_invoice(&new_invoice(99, &[(1, 1, 1000)])).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(storage.list_invoices().await.unwrap().is_empty());
        assert!(storage.invoice_items(1).unwrap().is_empty());
        assert_eq!(storage.last_invoice_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_swaps_lines_and_upserts_history() {
        let storage = storage_with_client().await;
        storage
            .insert_invoice(&new_invoice(1, &[(1, 2, 1000), (2, 3, 500)]))
            .await
            .unwrap();
        storage.remove_history(1).unwrap();

        storage
            .replace_invoice(1, &new_invoice(1, &[(3, 1, 700)]))
            .await
            .unwrap()
            .unwrap();

        let items = storage.invoice_items(1).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].producto_id, 3);
        assert_eq!(storage.history_count(1).unwrap(), 1);
        assert_eq!(
            storage.get_history(1).await.unwrap().unwrap().total,
            Decimal::from(700)
        );
    }

    #[tokio::test]
    async fn replace_of_missing_invoice_is_none() {
        let storage = storage_with_client().await;
        let result = storage
            .replace_invoice(5, &new_invoice(1, &[(1, 1, 10)]))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn search_limits_results_and_matches_ids() {
        let storage = InMemoryStorage::new();
        for i in 0..15 {
            storage
                .create_product(&CreateProduct {
                    descripcion: format!("Galletas sabor {}", i),
                    precio_venta: Decimal::from(1000),
                    precio_venta2: None,
                })
                .await
                .unwrap();
        }

        let term = SearchTerm::parse("galletas").unwrap();
        assert_eq!(storage.search_products(&term).await.unwrap().len(), 10);

        let term = SearchTerm::parse("12").unwrap();
        let ids: Vec<i64> = storage
            .search_products(&term)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert!(ids.contains(&12));
    }

    #[tokio::test]
    async fn client_with_invoices_cannot_be_deleted() {
        let storage = storage_with_client().await;
        storage
            .insert_invoice(&new_invoice(1, &[(1, 1, 1000)]))
            .await
            .unwrap();

        let result = storage.delete_client(1).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn tokens_are_consumed_once_and_by_kind() {
        let storage = InMemoryStorage::new();
        let user = storage
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                password_hash: "hash".to_string(),
                nombres: "Ana".to_string(),
                apellidos: "Gómez".to_string(),
            })
            .await
            .unwrap();
        let token = AuthToken::new(
            user.id,
            TokenKind::PasswordReset,
            "abc".to_string(),
            chrono::Duration::hours(1),
        );
        storage.insert_token(&token).await.unwrap();

        assert!(storage
            .take_token("abc", TokenKind::EmailVerification)
            .await
            .unwrap()
            .is_none());
        assert!(storage
            .take_token("abc", TokenKind::PasswordReset)
            .await
            .unwrap()
            .is_some());
        assert!(storage
            .take_token("abc", TokenKind::PasswordReset)
            .await
            .unwrap()
            .is_none());
    }
}
