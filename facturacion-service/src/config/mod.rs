//! Configuration module for facturacion-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct FacturacionConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub business: BusinessConfig,
    /// `None` logs e-mail links instead of sending them.
    pub smtp: Option<SmtpConfig>,
    /// Base URL used in e-mailed links.
    pub public_url: String,
    pub cookie_secure: bool,
    /// Drafts untouched for this long are discarded.
    pub draft_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_minutes: i64,
}

/// Company details printed on invoices, and the business time zone.
#[derive(Debug, Clone)]
pub struct BusinessConfig {
    pub utc_offset_hours: i32,
    pub name: String,
    pub nit: String,
    pub address: String,
    pub phone: String,
    pub terms: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from: String,
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn text(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl FacturacionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => {
                let user = env::var("SMTP_USER").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("SMTP_USER is required with SMTP_HOST"))
                })?;
                Some(SmtpConfig {
                    host,
                    port: parsed("SMTP_PORT", 587),
                    password: Secret::new(env::var("SMTP_PASSWORD").map_err(|_| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "SMTP_PASSWORD is required with SMTP_HOST"
                        ))
                    })?),
                    from: env::var("SMTP_FROM").unwrap_or_else(|_| user.clone()),
                    user,
                })
            }
            _ => None,
        };

        Ok(Self {
            service_name: text("SERVICE_NAME", "facturacion-service"),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: text("LOG_LEVEL", "info"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parsed("DATABASE_MIN_CONNECTIONS", 2),
            },
            jwt: JwtConfig {
                secret: Secret::new(env::var("JWT_SECRET").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("JWT_SECRET is required"))
                })?),
                expiry_minutes: parsed("JWT_EXPIRY_MINUTES", 480),
            },
            business: BusinessConfig {
                utc_offset_hours: parsed("BUSINESS_UTC_OFFSET_HOURS", -5),
                name: text("BUSINESS_NAME", "Distribuciones"),
                nit: text("BUSINESS_NIT", ""),
                address: text("BUSINESS_ADDRESS", ""),
                phone: text("BUSINESS_PHONE", ""),
                terms: text(
                    "INVOICE_TERMS",
                    "Esta remisión se asimila en todos sus efectos a una letra de cambio.",
                ),
            },
            public_url: text(
                "PUBLIC_URL",
                &format!("http://localhost:{}", common.port),
            ),
            cookie_secure: parsed("COOKIE_SECURE", false),
            draft_ttl_minutes: parsed("DRAFT_TTL_MINUTES", 120),
            smtp,
            common,
        })
    }
}
