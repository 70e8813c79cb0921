//! User account model for facturacion-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account that can sign in to the application.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub nombres: String,
    pub apellidos: String,
    pub verified: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub nombres: String,
    pub apellidos: String,
}

/// User fields safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nombres: user.nombres.clone(),
            apellidos: user.apellidos.clone(),
        }
    }
}

/// Purpose of a one-time e-mail token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "password_reset" => TokenKind::PasswordReset,
            _ => TokenKind::EmailVerification,
        }
    }
}

/// One-time token sent by e-mail.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub kind: String,
    pub expires_utc: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(user_id: Uuid, kind: TokenKind, token: String, ttl: chrono::Duration) -> Self {
        Self {
            token,
            user_id,
            kind: kind.as_str().to_string(),
            expires_utc: Utc::now() + ttl,
        }
    }

    pub fn kind(&self) -> TokenKind {
        TokenKind::from_string(&self.kind)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_utc
    }
}
