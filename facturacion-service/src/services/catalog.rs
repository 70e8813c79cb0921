//! Client and product catalogs.

use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::SearchTerm;
use crate::models::{Client, CreateClient, CreateProduct, Product, UpdateClient, UpdateProduct};
use crate::services::storage::Storage;

#[derive(Clone)]
pub struct CatalogService {
    storage: Arc<dyn Storage>,
}

fn client_not_found(id: i64) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client {} not found", id))
}

fn product_not_found(id: i64) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Product {} not found", id))
}

impl CatalogService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        self.storage.list_clients().await
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, AppError> {
        self.storage
            .get_client(id)
            .await?
            .ok_or_else(|| client_not_found(id))
    }

    /// Up to ten clients whose name or business contains `raw`, or whose id
    /// equals it. Text shorter than two characters yields nothing.
    pub async fn search_clients(&self, raw: &str) -> Result<Vec<Client>, AppError> {
        match SearchTerm::parse(raw) {
            Some(term) => self.storage.search_clients(&term).await,
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        let client = self.storage.create_client(&input.normalized()).await?;
        info!(client_id = client.id, "Client created");
        Ok(client)
    }

    #[instrument(skip(self, input))]
    pub async fn update_client(&self, id: i64, input: UpdateClient) -> Result<Client, AppError> {
        let client = self
            .storage
            .update_client(id, &input.normalized())
            .await?
            .ok_or_else(|| client_not_found(id))?;
        info!(client_id = id, "Client updated");
        Ok(client)
    }

    #[instrument(skip(self))]
    pub async fn delete_client(&self, id: i64) -> Result<(), AppError> {
        if !self.storage.delete_client(id).await? {
            return Err(client_not_found(id));
        }
        info!(client_id = id, "Client deleted");
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.storage.list_products().await
    }

    pub async fn get_product(&self, id: i64) -> Result<Product, AppError> {
        self.storage
            .get_product(id)
            .await?
            .ok_or_else(|| product_not_found(id))
    }

    pub async fn search_products(&self, raw: &str) -> Result<Vec<Product>, AppError> {
        match SearchTerm::parse(raw) {
            Some(term) => self.storage.search_products(&term).await,
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(&self, input: CreateProduct) -> Result<Product, AppError> {
        let product = self.storage.create_product(&input.normalized()).await?;
        info!(product_id = product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: i64,
        input: UpdateProduct,
    ) -> Result<Product, AppError> {
        let product = self
            .storage
            .update_product(id, &input.normalized())
            .await?
            .ok_or_else(|| product_not_found(id))?;
        info!(product_id = id, "Product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> Result<(), AppError> {
        if !self.storage.delete_product(id).await? {
            return Err(product_not_found(id));
        }
        info!(product_id = id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStorage;
    use rust_decimal::Decimal;

    fn catalog() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryStorage::new()))
    }

    fn new_client(cliente: &str, negocio: Option<&str>) -> CreateClient {
        CreateClient {
            negocio: negocio.map(str::to_string),
            cliente: cliente.to_string(),
            direccion: None,
            telefono: None,
            identificacion: None,
        }
    }

    #[tokio::test]
    async fn short_search_returns_nothing() {
        let catalog = catalog();
        catalog
            .create_client(new_client("Ana", Some("Abarrotes Ana")))
            .await
            .unwrap();

        assert!(catalog.search_clients("a").await.unwrap().is_empty());
        assert!(catalog.search_clients("  ").await.unwrap().is_empty());
        assert_eq!(catalog.search_clients("abarr").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_trims_text_fields() {
        let catalog = catalog();
        let client = catalog
            .create_client(new_client("  Luis Mora ", Some("   ")))
            .await
            .unwrap();

        assert_eq!(client.cliente, "Luis Mora");
        assert_eq!(client.negocio, None);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let catalog = catalog();

        assert!(matches!(
            catalog.get_product(8).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete_client(8).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            catalog.update_product(8, UpdateProduct::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn product_update_keeps_unset_fields() {
        let catalog = catalog();
        let product = catalog
            .create_product(CreateProduct {
                descripcion: "Aceite 1L".to_string(),
                precio_venta: Decimal::from(9000),
                precio_venta2: Some(Decimal::from(8500)),
            })
            .await
            .unwrap();

        let updated = catalog
            .update_product(
                product.id,
                UpdateProduct {
                    precio_venta: Some(Decimal::from(9500)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.descripcion, "Aceite 1L");
        assert_eq!(updated.precio_venta, Decimal::from(9500));
        assert_eq!(updated.precio_venta2, Some(Decimal::from(8500)));
    }
}
