pub mod auth;
pub mod catalog;
pub mod database;
pub mod drafts;
pub mod email;
pub mod error;
pub mod invoices;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod storage;

pub use auth::AuthService;
pub use catalog::CatalogService;
pub use database::Database;
pub use drafts::{DraftService, DraftStore};
pub use email::{EmailProvider, LogEmailService, SmtpEmailService};
pub use error::ServiceError;
pub use invoices::InvoiceService;
pub use jwt::{JwtService, SessionClaims, TokenResponse};
pub use memory::InMemoryStorage;
pub use metrics::{get_metrics, init_metrics};
pub use storage::{Storage, UserStore};
