pub mod auth;

pub use auth::{require_page_session, require_session, AuthUser, SESSION_COOKIE};
