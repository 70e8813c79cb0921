//! Application startup and lifecycle management.

use crate::config::FacturacionConfig;
use crate::domain::BusinessClock;
use crate::handlers::{auth, clients, drafts, health, home, invoices, print, products, summary};
use crate::middleware::{require_page_session, require_session};
use crate::services::{
    init_metrics, AuthService, CatalogService, Database, DraftService, DraftStore, EmailProvider,
    InMemoryStorage, InvoiceService, JwtService, LogEmailService, SmtpEmailService, Storage,
    UserStore,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: FacturacionConfig,
    pub storage: Arc<dyn Storage>,
    pub catalog: CatalogService,
    pub invoices: InvoiceService,
    pub auth: AuthService,
    pub drafts: DraftService,
}

impl AppState {
    /// Wire the services over the given backends.
    pub fn new(
        config: FacturacionConfig,
        storage: Arc<dyn Storage>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        let clock = BusinessClock::new(config.business.utc_offset_hours)
            .map_err(AppError::ConfigError)?;
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.expiry_minutes)
            .map_err(AppError::ConfigError)?;

        let catalog = CatalogService::new(storage.clone());
        let invoices = InvoiceService::new(storage.clone(), clock);
        let drafts = DraftService::new(DraftStore::new(), catalog.clone(), invoices.clone());
        let auth = AuthService::new(users, email, jwt, config.public_url.clone());

        Ok(Self {
            config,
            storage,
            catalog,
            invoices,
            auth,
            drafts,
        })
    }
}

fn cors_layer(public_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match public_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, public_url = %public_url, "PUBLIC_URL is not a valid origin");
            layer
        }
    }
}

/// All routes with their gates and the shared middleware stack.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/home", get(home::home))
        .route("/auth/session", get(auth::session))
        .route("/auth/password", put(auth::update_password))
        .route("/auth/sign-out", post(auth::sign_out))
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route("/clients/search", get(clients::search_clients))
        .route(
            "/clients/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/search", get(products::search_products))
        .route(
            "/products/:id",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/invoices/next-number", get(invoices::next_number))
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice).put(invoices::replace_invoice),
        )
        .route("/invoices/:id/editable", get(invoices::editable_invoice))
        .route("/invoices/:id/draft", post(invoices::open_invoice_draft))
        .route("/drafts", post(drafts::create_draft))
        .route(
            "/drafts/:id",
            get(drafts::get_draft).delete(drafts::discard_draft),
        )
        .route("/drafts/:id/client", put(drafts::select_client))
        .route("/drafts/:id/observaciones", put(drafts::set_observaciones))
        .route(
            "/drafts/:id/client-suggestions",
            get(drafts::client_suggestions),
        )
        .route(
            "/drafts/:id/product-suggestions",
            get(drafts::product_suggestions),
        )
        .route("/drafts/:id/items", post(drafts::add_item))
        .route(
            "/drafts/:id/items/:index",
            patch(drafts::update_item).delete(drafts::remove_item),
        )
        .route("/drafts/:id/save", post(drafts::save_draft))
        .route("/summary/today", get(summary::today))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let pages = Router::new()
        .route("/invoices/:id/print", get(print::print_invoice))
        .route_layer(from_fn_with_state(state.clone(), require_page_session));

    let cors = cors_layer(&state.config.public_url);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/verify", get(auth::verify_email))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route(
            "/auth/password-reset/request",
            post(auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .merge(api)
        .merge(pages)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: FacturacionConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this when the schema is managed outside the service.
    pub async fn build_without_migrations(config: FacturacionConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: FacturacionConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        let (storage, users): (Arc<dyn Storage>, Arc<dyn UserStore>) = if config.database.is_memory()
        {
            tracing::warn!("DATABASE_URL is memory://, data is lost on restart");
            let memory = Arc::new(InMemoryStorage::new());
            (memory.clone(), memory)
        } else {
            let db = Database::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;

            if run_migrations {
                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
            }

            let db = Arc::new(db);
            (db.clone(), db)
        };

        let email: Arc<dyn EmailProvider> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpEmailService::new(smtp)?),
            None => {
                tracing::warn!("SMTP not configured, e-mail links are only logged");
                Arc::new(LogEmailService)
            }
        };

        Self::build_with(config, storage, users, email).await
    }

    /// Build over explicit backends.
    pub async fn build_with(
        config: FacturacionConfig,
        storage: Arc<dyn Storage>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState::new(config, storage, users, email)?;

        let addr = state.config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "facturacion-service listener bound");

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let ttl = chrono::Duration::minutes(self.state.config.draft_ttl_minutes);
        let _sweeper = self
            .state
            .drafts
            .store()
            .spawn_sweeper(ttl, std::time::Duration::from_secs(60));

        let app = router(self.state);
        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
