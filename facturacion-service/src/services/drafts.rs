//! Server-held invoice drafts and the operations of the invoice form.
//!
//! Each draft lives in a [`DashMap`] entry; holding the entry gives exclusive
//! access, so every edit is applied atomically. Storage lookups happen before
//! the entry is taken, never while it is held.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::domain::format::invoice_number;
use crate::domain::{DraftView, InvoiceDraft, SuggestionField};
use crate::dtos::drafts::{SavedDraft, Suggestions, UpdateItemRequest};
use crate::models::{Client, Product};
use crate::services::catalog::CatalogService;
use crate::services::invoices::InvoiceService;
use crate::services::metrics::{rejection, DRAFTS_OPEN};

fn draft_not_found(id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Draft {} not found", id))
}

/// Drafts keyed by id. A draft is only visible to the session subject that
/// opened it.
#[derive(Clone, Default)]
pub struct DraftStore {
    drafts: Arc<DashMap<Uuid, InvoiceDraft>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, draft: InvoiceDraft) -> DraftView {
        let view = DraftView::from(&draft);
        self.drafts.insert(draft.id, draft);
        DRAFTS_OPEN.set(self.drafts.len() as i64);
        view
    }

    pub fn view(&self, id: Uuid, owner: &str) -> Result<DraftView, AppError> {
        self.drafts
            .get(&id)
            .filter(|draft| draft.owner == owner)
            .map(|draft| DraftView::from(&*draft))
            .ok_or_else(|| draft_not_found(id))
    }

    /// Run `f` with exclusive access to the draft.
    pub fn with_draft<T>(
        &self,
        id: Uuid,
        owner: &str,
        f: impl FnOnce(&mut InvoiceDraft) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut draft = self
            .drafts
            .get_mut(&id)
            .filter(|draft| draft.owner == owner)
            .ok_or_else(|| draft_not_found(id))?;

        let result = f(&mut *draft)?;
        draft.touch();
        Ok(result)
    }

    pub fn remove(&self, id: Uuid, owner: &str) -> Result<(), AppError> {
        self.drafts
            .remove_if(&id, |_, draft| draft.owner == owner)
            .ok_or_else(|| draft_not_found(id))?;
        DRAFTS_OPEN.set(self.drafts.len() as i64);
        Ok(())
    }

    /// Drop drafts untouched for longer than `ttl`. Returns how many went.
    pub fn evict_idle(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.drafts.len();
        self.drafts.retain(|_, draft| now - draft.updated_utc <= ttl);
        let after = self.drafts.len();
        DRAFTS_OPEN.set(after as i64);
        before.saturating_sub(after)
    }

    /// Sweep idle drafts every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, ttl: Duration, every: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(Utc::now(), ttl);
                if evicted > 0 {
                    info!(evicted = evicted, open = store.len(), "Idle drafts evicted");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

/// Invoice form operations on top of the draft store.
#[derive(Clone)]
pub struct DraftService {
    store: DraftStore,
    catalog: CatalogService,
    invoices: InvoiceService,
}

impl DraftService {
    pub fn new(store: DraftStore, catalog: CatalogService, invoices: InvoiceService) -> Self {
        Self {
            store,
            catalog,
            invoices,
        }
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    pub fn create(&self, owner: &str) -> DraftView {
        self.store.insert(InvoiceDraft::new(owner))
    }

    /// Draft in edit mode, seeded from a stored invoice.
    pub async fn open_for_edit(&self, owner: &str, factura_id: i64) -> Result<DraftView, AppError> {
        let editable = self.invoices.editable(factura_id).await?;
        let view = self.store.insert(InvoiceDraft::for_invoice(owner, editable)?);
        info!(draft_id = %view.id, factura_id = factura_id, "Invoice opened for editing");
        Ok(view)
    }

    pub fn get(&self, owner: &str, id: Uuid) -> Result<DraftView, AppError> {
        self.store.view(id, owner)
    }

    pub fn discard(&self, owner: &str, id: Uuid) -> Result<(), AppError> {
        self.store.remove(id, owner)
    }

    pub async fn select_client(
        &self,
        owner: &str,
        id: Uuid,
        cliente_id: Option<i64>,
    ) -> Result<DraftView, AppError> {
        let client = match cliente_id {
            Some(cliente_id) => Some(self.catalog.get_client(cliente_id).await?),
            None => None,
        };

        self.store.with_draft(id, owner, |draft| {
            draft.cliente = client;
            Ok(DraftView::from(&*draft))
        })
    }

    pub fn set_observaciones(
        &self,
        owner: &str,
        id: Uuid,
        observaciones: Option<String>,
    ) -> Result<DraftView, AppError> {
        self.store.with_draft(id, owner, |draft| {
            draft.observaciones = observaciones;
            Ok(DraftView::from(&*draft))
        })
    }

    pub async fn add_item(
        &self,
        owner: &str,
        id: Uuid,
        producto_id: i64,
    ) -> Result<DraftView, AppError> {
        let product = self.catalog.get_product(producto_id).await?;

        self.store.with_draft(id, owner, |draft| {
            draft
                .items
                .add_product(&product)
                .map_err(|e| rejection(e.reason(), e))?;
            Ok(DraftView::from(&*draft))
        })
    }

    pub fn update_item(
        &self,
        owner: &str,
        id: Uuid,
        index: usize,
        req: UpdateItemRequest,
    ) -> Result<DraftView, AppError> {
        self.store.with_draft(id, owner, |draft| {
            let mut items = draft.items.clone();
            if let Some(cantidad) = req.cantidad {
                items
                    .update_quantity(index, cantidad)
                    .map_err(|e| rejection(e.reason(), e))?;
            }
            if let Some(precio) = req.precio {
                items
                    .update_price(index, precio)
                    .map_err(|e| rejection(e.reason(), e))?;
            }
            draft.items = items;
            Ok(DraftView::from(&*draft))
        })
    }

    pub fn remove_item(&self, owner: &str, id: Uuid, index: usize) -> Result<DraftView, AppError> {
        self.store.with_draft(id, owner, |draft| {
            draft
                .items
                .remove(index)
                .map_err(|e| rejection(e.reason(), e))?;
            Ok(DraftView::from(&*draft))
        })
    }

    pub async fn client_suggestions(
        &self,
        owner: &str,
        id: Uuid,
        q: &str,
    ) -> Result<Suggestions<Client>, AppError> {
        let ticket = self.issue(owner, id, SuggestionField::Client)?;
        let results = self.catalog.search_clients(q).await?;
        self.settle(owner, id, SuggestionField::Client, ticket, results)
    }

    pub async fn product_suggestions(
        &self,
        owner: &str,
        id: Uuid,
        q: &str,
    ) -> Result<Suggestions<Product>, AppError> {
        let ticket = self.issue(owner, id, SuggestionField::Product)?;
        let results = self.catalog.search_products(q).await?;
        self.settle(owner, id, SuggestionField::Product, ticket, results)
    }

    fn issue(&self, owner: &str, id: Uuid, field: SuggestionField) -> Result<u64, AppError> {
        self.store
            .with_draft(id, owner, |draft| Ok(draft.suggestions.issue(field)))
    }

    fn settle<T>(
        &self,
        owner: &str,
        id: Uuid,
        field: SuggestionField,
        ticket: u64,
        results: Vec<T>,
    ) -> Result<Suggestions<T>, AppError> {
        let current = self
            .store
            .with_draft(id, owner, |draft| Ok(draft.suggestions.is_current(field, ticket)))?;

        Ok(Suggestions {
            ticket,
            stale: !current,
            results: if current { results } else { Vec::new() },
        })
    }

    /// Store the draft as an invoice. A new invoice leaves a blank draft for
    /// the next one; a saved edit closes the draft.
    pub async fn save(&self, owner: &str, id: Uuid) -> Result<SavedDraft, AppError> {
        let (submission, factura_id) = self.store.with_draft(id, owner, |draft| {
            let submission = draft
                .submission()
                .map_err(|e| rejection(e.reason(), e))?;
            Ok((submission, draft.factura_id))
        })?;

        match factura_id {
            Some(factura_id) => {
                let invoice = self.invoices.replace(factura_id, submission).await?;
                self.store.remove(id, owner)?;
                Ok(SavedDraft {
                    numero: invoice_number(invoice.id),
                    invoice,
                    draft: None,
                })
            }
            None => {
                let invoice = self.invoices.create(submission).await?;
                let draft = self.store.with_draft(id, owner, |draft| {
                    draft.reset();
                    Ok(DraftView::from(&*draft))
                })?;
                Ok(SavedDraft {
                    numero: invoice_number(invoice.id),
                    invoice,
                    draft: Some(draft),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusinessClock, ListMode, PriceSelection};
    use crate::models::{CreateClient, CreateProduct};
    use crate::services::memory::InMemoryStorage;
    use crate::services::storage::Storage;
    use rust_decimal::Decimal;

    const OWNER: &str = "user-1";

    async fn service() -> (DraftService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .create_client(&CreateClient {
                negocio: None,
                cliente: "Pedro Gil".to_string(),
                direccion: None,
                telefono: None,
                identificacion: Some("1020304050".to_string()),
            })
            .await
            .unwrap();
        for (descripcion, precio) in [("Azúcar 1kg", 1000), ("Sal 500g", 500)] {
            storage
                .create_product(&CreateProduct {
                    descripcion: descripcion.to_string(),
                    precio_venta: Decimal::from(precio),
                    precio_venta2: None,
                })
                .await
                .unwrap();
        }

        let catalog = CatalogService::new(storage.clone());
        let invoices = InvoiceService::new(storage.clone(), BusinessClock::new(-5).unwrap());
        (
            DraftService::new(DraftStore::new(), catalog, invoices),
            storage,
        )
    }

    #[tokio::test]
    async fn drafts_are_private_to_their_owner() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);

        assert!(drafts.get(OWNER, draft.id).is_ok());
        assert!(matches!(
            drafts.get("user-2", draft.id),
            Err(AppError::NotFound(_))
        ));
        assert!(drafts.discard("user-2", draft.id).is_err());
        assert!(drafts.discard(OWNER, draft.id).is_ok());
    }

    #[tokio::test]
    async fn rejected_update_leaves_item_untouched() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);
        drafts.add_item(OWNER, draft.id, 1).await.unwrap();

        let result = drafts.update_item(
            OWNER,
            draft.id,
            0,
            UpdateItemRequest {
                cantidad: Some(Decimal::from(4)),
                precio: Some(PriceSelection::Manual(Decimal::from(-1))),
            },
        );

        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
        let view = drafts.get(OWNER, draft.id).unwrap();
        assert_eq!(view.items[0].cantidad, Decimal::ONE);
        assert_eq!(view.total, Decimal::from(1000));
    }

    #[tokio::test]
    async fn saving_without_client_stores_nothing() {
        let (drafts, storage) = service().await;
        let draft = drafts.create(OWNER);
        drafts.add_item(OWNER, draft.id, 1).await.unwrap();

        let result = drafts.save(OWNER, draft.id).await;

        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
        assert_eq!(storage.last_invoice_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saving_a_new_invoice_resets_the_draft() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);
        drafts.select_client(OWNER, draft.id, Some(1)).await.unwrap();
        drafts.add_item(OWNER, draft.id, 1).await.unwrap();
        drafts.add_item(OWNER, draft.id, 2).await.unwrap();

        let saved = drafts.save(OWNER, draft.id).await.unwrap();

        assert_eq!(saved.numero, "0001");
        assert_eq!(saved.invoice.total, Decimal::from(1500));
        let blank = saved.draft.unwrap();
        assert!(blank.cliente.is_none());
        assert!(blank.items.is_empty());
    }

    #[tokio::test]
    async fn edit_draft_is_closed_after_saving() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);
        drafts.select_client(OWNER, draft.id, Some(1)).await.unwrap();
        drafts.add_item(OWNER, draft.id, 1).await.unwrap();
        let saved = drafts.save(OWNER, draft.id).await.unwrap();

        let edit = drafts
            .open_for_edit(OWNER, saved.invoice.id)
            .await
            .unwrap();
        assert_eq!(edit.mode, ListMode::Edit);
        assert!(drafts.remove_item(OWNER, edit.id, 0).is_err());

        drafts
            .update_item(
                OWNER,
                edit.id,
                0,
                UpdateItemRequest {
                    cantidad: Some(Decimal::from(3)),
                    precio: None,
                },
            )
            .unwrap();
        let resaved = drafts.save(OWNER, edit.id).await.unwrap();

        assert_eq!(resaved.invoice.id, saved.invoice.id);
        assert_eq!(resaved.invoice.total, Decimal::from(3000));
        assert!(resaved.draft.is_none());
        assert!(drafts.get(OWNER, edit.id).is_err());
    }

    #[tokio::test]
    async fn superseded_suggestions_are_stale() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);

        let first = drafts.issue(OWNER, draft.id, SuggestionField::Product).unwrap();
        let second = drafts.issue(OWNER, draft.id, SuggestionField::Product).unwrap();

        let old = drafts
            .settle(OWNER, draft.id, SuggestionField::Product, first, vec![1, 2])
            .unwrap();
        let new = drafts
            .settle(OWNER, draft.id, SuggestionField::Product, second, vec![3])
            .unwrap();

        assert!(old.stale);
        assert!(old.results.is_empty());
        assert!(!new.stale);
        assert_eq!(new.results, vec![3]);
    }

    #[tokio::test]
    async fn idle_drafts_are_evicted_and_active_ones_kept() {
        let (drafts, _) = service().await;
        let idle = drafts.create(OWNER);
        let active = drafts.create(OWNER);
        let store = drafts.store();

        if let Some(mut draft) = store.drafts.get_mut(&idle.id) {
            draft.updated_utc = Utc::now() - Duration::hours(3);
        }
        drafts.add_item(OWNER, active.id, 1).await.unwrap();

        let evicted = store.evict_idle(Utc::now(), Duration::hours(2));

        assert_eq!(evicted, 1);
        assert!(drafts.get(OWNER, idle.id).is_err());
        assert_eq!(drafts.get(OWNER, active.id).unwrap().items.len(), 1);
        assert_eq!(store.evict_idle(Utc::now(), Duration::hours(2)), 0);
    }

    #[tokio::test]
    async fn sweeper_runs_on_its_interval() {
        let (drafts, _) = service().await;
        let draft = drafts.create(OWNER);
        let handle = drafts
            .store()
            .spawn_sweeper(Duration::zero(), std::time::Duration::from_millis(10));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(drafts.get(OWNER, draft.id).is_err());
        assert!(drafts.store().is_empty());
        handle.abort();
    }
}
