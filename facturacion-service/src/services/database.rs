//! PostgreSQL storage for facturacion-service.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::search::SEARCH_LIMIT;
use crate::domain::SearchTerm;
use crate::models::{
    AuthToken, Client, CreateClient, CreateProduct, HistoryRecord, Invoice, InvoiceDetail,
    InvoiceDetailItem, InvoiceSummary, NewInvoice, NewInvoiceItem, NewUser, Product, TokenKind,
    UpdateClient, UpdateProduct, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::storage::{Storage, UserStore};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", context, e))
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "facturacion-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn insert_items(
        conn: &mut PgConnection,
        factura_id: i64,
        items: &[NewInvoiceItem],
    ) -> Result<(), AppError> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO items_factura (factura_id, producto_id, cantidad, precio_unitario, subtotal)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(factura_id)
            .bind(item.producto_id)
            .bind(item.cantidad)
            .bind(item.precio_unitario)
            .bind(item.subtotal)
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("insert invoice item", e))?;
        }
        Ok(())
    }

    async fn insert_history(
        conn: &mut PgConnection,
        history: &HistoryRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO historial_facturas (factura_id, cliente_id, total, fecha, observaciones)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(history.factura_id)
        .bind(history.cliente_id)
        .bind(history.total)
        .bind(history.fecha)
        .bind(&history.observaciones)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("insert invoice history", e))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, negocio, cliente, direccion, telefono, identificacion
            FROM clientes
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list clients", e))?;

        timer.observe_duration();
        Ok(clients)
    }

    #[instrument(skip(self), fields(cliente_id = id))]
    async fn get_client(&self, id: i64) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, negocio, cliente, direccion, telefono, identificacion
            FROM clientes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get client", e))?;

        timer.observe_duration();
        Ok(client)
    }

    #[instrument(skip(self), fields(text = %term.text))]
    async fn search_clients(&self, term: &SearchTerm) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["search_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, negocio, cliente, direccion, telefono, identificacion
            FROM clientes
            WHERE cliente ILIKE $1 OR negocio ILIKE $1 OR id = $2
            ORDER BY id
            LIMIT $3
            "#,
        )
        .bind(term.like_pattern())
        .bind(term.id)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("search clients", e))?;

        timer.observe_duration();
        Ok(clients)
    }

    #[instrument(skip(self, input))]
    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clientes (negocio, cliente, direccion, telefono, identificacion)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, negocio, cliente, direccion, telefono, identificacion
            "#,
        )
        .bind(&input.negocio)
        .bind(&input.cliente)
        .bind(&input.direccion)
        .bind(&input.telefono)
        .bind(&input.identificacion)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create client", e))?;

        timer.observe_duration();

        info!(cliente_id = client.id, "Client created");
        Ok(client)
    }

    #[instrument(skip(self, input), fields(cliente_id = id))]
    async fn update_client(
        &self,
        id: i64,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clientes
            SET negocio = CASE WHEN $2 THEN $3 ELSE negocio END,
                cliente = COALESCE($4, cliente),
                direccion = CASE WHEN $5 THEN $6 ELSE direccion END,
                telefono = CASE WHEN $7 THEN $8 ELSE telefono END,
                identificacion = CASE WHEN $9 THEN $10 ELSE identificacion END
            WHERE id = $1
            RETURNING id, negocio, cliente, direccion, telefono, identificacion
            "#,
        )
        .bind(id)
        .bind(input.negocio.is_some())
        .bind(input.negocio.clone().flatten())
        .bind(&input.cliente)
        .bind(input.direccion.is_some())
        .bind(input.direccion.clone().flatten())
        .bind(input.telefono.is_some())
        .bind(input.telefono.clone().flatten())
        .bind(input.identificacion.is_some())
        .bind(input.identificacion.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update client", e))?;

        timer.observe_duration();

        if client.is_some() {
            info!(cliente_id = id, "Client updated");
        }
        Ok(client)
    }

    #[instrument(skip(self), fields(cliente_id = id))]
    async fn delete_client(&self, id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clientes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!("Client {} has invoices", id))
                }
                _ => db_error("delete client", e),
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(cliente_id = id, "Client deleted");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_products"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, descripcion, precio_venta, precio_venta2
            FROM productos
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list products", e))?;

        timer.observe_duration();
        Ok(products)
    }

    #[instrument(skip(self), fields(producto_id = id))]
    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, descripcion, precio_venta, precio_venta2
            FROM productos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get product", e))?;

        timer.observe_duration();
        Ok(product)
    }

    #[instrument(skip(self), fields(text = %term.text))]
    async fn search_products(&self, term: &SearchTerm) -> Result<Vec<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["search_products"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, descripcion, precio_venta, precio_venta2
            FROM productos
            WHERE descripcion ILIKE $1 OR id = $2
            ORDER BY id
            LIMIT $3
            "#,
        )
        .bind(term.like_pattern())
        .bind(term.id)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("search products", e))?;

        timer.observe_duration();
        Ok(products)
    }

    #[instrument(skip(self, input))]
    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO productos (descripcion, precio_venta, precio_venta2)
            VALUES ($1, $2, $3)
            RETURNING id, descripcion, precio_venta, precio_venta2
            "#,
        )
        .bind(&input.descripcion)
        .bind(input.precio_venta)
        .bind(input.precio_venta2)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create product", e))?;

        timer.observe_duration();

        info!(producto_id = product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self, input), fields(producto_id = id))]
    async fn update_product(
        &self,
        id: i64,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE productos
            SET descripcion = COALESCE($2, descripcion),
                precio_venta = COALESCE($3, precio_venta),
                precio_venta2 = CASE WHEN $4 THEN $5 ELSE precio_venta2 END
            WHERE id = $1
            RETURNING id, descripcion, precio_venta, precio_venta2
            "#,
        )
        .bind(id)
        .bind(&input.descripcion)
        .bind(input.precio_venta)
        .bind(input.precio_venta2.is_some())
        .bind(input.precio_venta2.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update product", e))?;

        timer.observe_duration();

        if product.is_some() {
            info!(producto_id = id, "Product updated");
        }
        Ok(product)
    }

    #[instrument(skip(self), fields(producto_id = id))]
    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_product"])
            .start_timer();

        let result = sqlx::query("DELETE FROM productos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete product", e))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(producto_id = id, "Product deleted");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, InvoiceSummary>(
            r#"
            SELECT f.id, f.fecha, f.total, f.cliente_id, c.cliente, c.negocio
            FROM facturas f
            LEFT JOIN clientes c ON c.id = f.cliente_id
            ORDER BY f.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list invoices", e))?;

        timer.observe_duration();
        Ok(invoices)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn list_invoices_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices_between"])
            .start_timer();

        let invoices = sqlx::query_as::<_, InvoiceSummary>(
            r#"
            SELECT f.id, f.fecha, f.total, f.cliente_id, c.cliente, c.negocio
            FROM facturas f
            LEFT JOIN clientes c ON c.id = f.cliente_id
            WHERE f.fecha >= $1 AND f.fecha <= $2
            ORDER BY f.id DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list invoices by date", e))?;

        timer.observe_duration();
        Ok(invoices)
    }

    #[instrument(skip(self), fields(factura_id = id))]
    async fn get_invoice_detail(&self, id: i64) -> Result<Option<InvoiceDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_detail"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, cliente_id, fecha, cantidad, subtotal, total, observaciones
            FROM facturas
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get invoice", e))?;

        let Some(invoice) = invoice else {
            timer.observe_duration();
            return Ok(None);
        };

        let cliente = self.get_client(invoice.cliente_id).await?;

        let items = sqlx::query_as::<_, InvoiceDetailItem>(
            r#"
            SELECT i.producto_id, i.cantidad, i.precio_unitario, i.subtotal,
                   p.descripcion, p.precio_venta, p.precio_venta2
            FROM items_factura i
            LEFT JOIN productos p ON p.id = i.producto_id
            WHERE i.factura_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get invoice items", e))?;

        timer.observe_duration();

        Ok(Some(InvoiceDetail {
            invoice,
            cliente,
            items,
        }))
    }

    #[instrument(skip(self))]
    async fn last_invoice_id(&self) -> Result<Option<i64>, AppError> {
        let id = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(id) FROM facturas")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("get last invoice id", e))?;
        Ok(id)
    }

    #[instrument(skip(self), fields(factura_id = factura_id))]
    async fn get_history(&self, factura_id: i64) -> Result<Option<HistoryRecord>, AppError> {
        let record = sqlx::query_as::<_, HistoryRecord>(
            r#"
            SELECT factura_id, cliente_id, total, fecha, observaciones
            FROM historial_facturas
            WHERE factura_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(factura_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get invoice history", e))?;
        Ok(record)
    }

    #[instrument(skip(self, input), fields(cliente_id = input.cliente_id, items = input.items.len()))]
    async fn insert_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO facturas (cliente_id, fecha, cantidad, subtotal, total, observaciones)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, cliente_id, fecha, cantidad, subtotal, total, observaciones
            "#,
        )
        .bind(input.cliente_id)
        .bind(input.fecha)
        .bind(input.cantidad)
        .bind(input.subtotal)
        .bind(input.total)
        .bind(&input.observaciones)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Client {} not found", input.cliente_id))
            }
            _ => db_error("insert invoice", e),
        })?;

        Self::insert_items(&mut tx, invoice.id, &input.items).await?;
        Self::insert_history(&mut tx, &input.history(invoice.id)).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(factura_id = invoice.id, total = %invoice.total, "Invoice created");
        Ok(invoice)
    }

    #[instrument(skip(self, input), fields(factura_id = id, items = input.items.len()))]
    async fn replace_invoice(
        &self,
        id: i64,
        input: &NewInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE facturas
            SET cliente_id = $2,
                fecha = $3,
                cantidad = $4,
                subtotal = $5,
                total = $6,
                observaciones = $7
            WHERE id = $1
            RETURNING id, cliente_id, fecha, cantidad, subtotal, total, observaciones
            "#,
        )
        .bind(id)
        .bind(input.cliente_id)
        .bind(input.fecha)
        .bind(input.cantidad)
        .bind(input.subtotal)
        .bind(input.total)
        .bind(&input.observaciones)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Client {} not found", input.cliente_id))
            }
            _ => db_error("update invoice", e),
        })?;

        let Some(invoice) = invoice else {
            tx.rollback().await.ok();
            timer.observe_duration();
            return Ok(None);
        };

        sqlx::query("DELETE FROM items_factura WHERE factura_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("delete invoice items", e))?;

        Self::insert_items(&mut tx, id, &input.items).await?;

        let history = input.history(id);
        let updated = sqlx::query(
            r#"
            UPDATE historial_facturas
            SET cliente_id = $2, total = $3, fecha = $4, observaciones = $5
            WHERE factura_id = $1
            "#,
        )
        .bind(id)
        .bind(history.cliente_id)
        .bind(history.total)
        .bind(history.fecha)
        .bind(&history.observaciones)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update invoice history", e))?;

        if updated.rows_affected() == 0 {
            tracing::warn!(factura_id = id, "Invoice had no history record, inserting one");
            Self::insert_history(&mut tx, &history).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(factura_id = id, total = %invoice.total, "Invoice replaced");
        Ok(Some(invoice))
    }
}

#[async_trait]
impl UserStore for Database {
    #[instrument(skip(self, input))]
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO usuarios (id, email, password_hash, nombres, apellidos, verified)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id, email, password_hash, nombres, apellidos, verified, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.nombres)
        .bind(&input.apellidos)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => db_error("create user", e),
        })?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, nombres, apellidos, verified, created_utc
            FROM usuarios
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find user", e))
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, nombres, apellidos, verified, created_utc
            FROM usuarios
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find user", e))
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE usuarios SET verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("verify user", e))?;
        Ok(())
    }

    #[instrument(skip(self, password_hash), fields(user_id = %id))]
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE usuarios SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update password", e))?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %token.user_id, kind = %token.kind))]
    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (token, user_id, kind, expires_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(&token.kind)
        .bind(token.expires_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("store token", e))?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(kind = kind.as_str()))]
    async fn take_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<AuthToken>, AppError> {
        sqlx::query_as::<_, AuthToken>(
            r#"
            DELETE FROM auth_tokens
            WHERE token = $1 AND kind = $2
            RETURNING token, user_id, kind, expires_utc
            "#,
        )
        .bind(token)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("consume token", e))
    }
}
