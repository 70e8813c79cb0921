//! Common test utilities for facturacion-service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use facturacion_service::config::{
    BusinessConfig, DatabaseConfig, FacturacionConfig, JwtConfig, MEMORY_DATABASE_URL,
};
use facturacion_service::services::{EmailProvider, InMemoryStorage};
use facturacion_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use service_core::error::AppError;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub const PUBLIC_URL: &str = "http://localhost:3000";
pub const PASSWORD: &str = "clave-segura-1";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,facturacion_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub link: String,
}

/// Keeps every e-mail instead of sending it.
#[derive(Default)]
pub struct RecordingEmailProvider {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailProvider {
    fn record(&self, to: &str, link: &str) {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            link: link.to_string(),
        });
    }

    pub fn last_to(&self, to: &str) -> Option<SentEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|mail| mail.to == to)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailProvider for RecordingEmailProvider {
    async fn send_verification_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        self.record(to_email, link);
        Ok(())
    }

    async fn send_password_reset_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        self.record(to_email, link);
        Ok(())
    }
}

/// `token` query value of an e-mailed link.
pub fn token_from_link(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .map(|rest| rest.split('&').next().unwrap_or(rest).to_string())
        .expect("link carries a token")
}

pub fn test_config() -> FacturacionConfig {
    FacturacionConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "facturacion-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret-with-enough-bytes".to_string()),
            expiry_minutes: 60,
        },
        business: BusinessConfig {
            utc_offset_hours: -5,
            name: "Distribuciones El Sol".to_string(),
            nit: "900.123.456-7".to_string(),
            address: "Cra 10 # 20-30".to_string(),
            phone: "3001234567".to_string(),
            terms: "Pago a 30 días".to_string(),
        },
        smtp: None,
        public_url: PUBLIC_URL.to_string(),
        cookie_secure: false,
        draft_ttl_minutes: 120,
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub storage: Arc<InMemoryStorage>,
    pub outbox: Arc<RecordingEmailProvider>,
}

impl TestApp {
    /// Spawn the application over fresh in-memory storage.
    pub async fn spawn() -> Self {
        init_tracing();

        let storage = Arc::new(InMemoryStorage::new());
        let outbox = Arc::new(RecordingEmailProvider::default());

        let app = Application::build_with(
            test_config(),
            storage.clone(),
            storage.clone(),
            outbox.clone(),
        )
        .await
        .expect("Failed to build application");

        let address = format!("http://127.0.0.1:{}", app.http_port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            address,
            client,
            storage,
            outbox,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn sign_up(&self, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/sign-up"))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "confirm_password": PASSWORD,
                "nombres": "Ana María",
                "apellidos": "Gómez",
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/sign-in"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register, verify and sign in; returns the session token.
    pub async fn signed_in_user(&self, email: &str) -> String {
        assert_eq!(self.sign_up(email).await.status(), 201);

        let mail = self.outbox.last_to(email).expect("verification e-mail");
        let verified = self
            .client
            .get(self.url("/auth/verify"))
            .query(&[("token", token_from_link(&mail.link))])
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(verified.status(), 200);

        let response = self.sign_in(email, PASSWORD).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_client(&self, token: &str, cliente: &str, negocio: Option<&str>) -> Value {
        let response = self
            .post(
                token,
                "/clients",
                json!({ "cliente": cliente, "negocio": negocio, "telefono": "3101234567" }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_product(
        &self,
        token: &str,
        descripcion: &str,
        precio_venta: &str,
        precio_venta2: Option<&str>,
    ) -> Value {
        let response = self
            .post(
                token,
                "/products",
                json!({
                    "descripcion": descripcion,
                    "precio_venta": precio_venta,
                    "precio_venta2": precio_venta2,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }
}

/// Decimal fields arrive as strings.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}
