use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::auth::{
        MessageResponse, PasswordResetConfirm, PasswordResetRequest, SignInRequest,
        SignInResponse, SignUpRequest, SignUpResponse, UpdatePasswordRequest,
    },
    models::{AuthToken, NewUser, TokenKind, User, UserProfile},
    services::{
        storage::UserStore, EmailProvider, JwtService, ServiceError, SessionClaims,
        TokenResponse,
    },
    utils::{generate_random_token, hash_password, verify_password, Password, PasswordHashString},
};

const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

/// Accounts, sessions and the e-mail flows around them.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    public_url: String,
    /// Signed-out token ids and their expiry, kept until the token would
    /// have expired anyway.
    revoked: Arc<DashMap<String, i64>>,
}

fn check_confirmation(password: &str, confirm: &str) -> Result<(), ServiceError> {
    if password != confirm {
        return Err(ServiceError::PasswordMismatch);
    }
    Ok(())
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        public_url: String,
    ) -> Self {
        Self {
            users,
            email,
            jwt,
            public_url: public_url.trim_end_matches('/').to_string(),
            revoked: Arc::new(DashMap::new()),
        }
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> Result<SignUpResponse, ServiceError> {
        check_confirmation(&req.password, &req.confirm_password)?;
        let email = req.email.trim().to_lowercase();

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(req.password))?;
        let user = self
            .users
            .create_user(&NewUser {
                email: email.clone(),
                password_hash: password_hash.into_string(),
                nombres: req.nombres.trim().to_string(),
                apellidos: req.apellidos.trim().to_string(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        let token = generate_random_token();
        self.users
            .insert_token(&AuthToken::new(
                user.id,
                TokenKind::EmailVerification,
                token.clone(),
                Duration::hours(VERIFICATION_TTL_HOURS),
            ))
            .await?;

        let link = format!("{}/auth/verify?token={}", self.public_url, token);
        self.email.send_verification_email(&email, &link).await?;

        Ok(SignUpResponse {
            user_id: user.id.to_string(),
            message: "Registration successful. Please check your email to verify your account."
                .to_string(),
        })
    }

    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, ServiceError> {
        let stored = self
            .users
            .take_token(token, TokenKind::EmailVerification)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if stored.is_expired() {
            return Err(ServiceError::TokenExpired);
        }

        self.users
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        self.users.mark_verified(stored.user_id).await?;

        tracing::info!(user_id = %stored.user_id, "Email verified");

        Ok(MessageResponse::new("Email verified successfully"))
    }

    pub async fn sign_in(&self, req: SignInRequest) -> Result<SignInResponse, ServiceError> {
        let email = req.email.trim().to_lowercase();
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.verified {
            return Err(ServiceError::EmailNotVerified);
        }

        let (access_token, _) = self
            .jwt
            .generate_session_token(&user.id.to_string(), &user.email)?;

        tracing::info!(user_id = %user.id, "User signed in");

        Ok(SignInResponse {
            token: TokenResponse {
                access_token,
                token_type: "Bearer".to_string(),
                expires_in: self.jwt.expiry_seconds(),
            },
            user: UserProfile::from(&user),
        })
    }

    /// Always succeeds for well-formed requests so callers cannot test for
    /// registered addresses.
    pub async fn request_password_reset(
        &self,
        req: PasswordResetRequest,
    ) -> Result<MessageResponse, ServiceError> {
        let redirect_to = match req.redirect_to {
            Some(url) if url.starts_with(&self.public_url) => url,
            Some(_) => return Err(ServiceError::InvalidRedirect),
            None => format!("{}/auth/reset-password", self.public_url),
        };

        let email = req.email.trim().to_lowercase();
        match self.users.find_user_by_email(&email).await? {
            Some(user) => {
                let token = generate_random_token();
                self.users
                    .insert_token(&AuthToken::new(
                        user.id,
                        TokenKind::PasswordReset,
                        token.clone(),
                        Duration::hours(RESET_TTL_HOURS),
                    ))
                    .await?;

                let link = format!("{}?token={}", redirect_to, token);
                self.email.send_password_reset_email(&email, &link).await?;
                tracing::info!(user_id = %user.id, "Password reset requested");
            }
            None => {
                tracing::info!("Password reset requested for unknown email");
            }
        }

        Ok(MessageResponse::new(
            "If the email is registered, a password reset link has been sent.",
        ))
    }

    pub async fn confirm_password_reset(
        &self,
        req: PasswordResetConfirm,
    ) -> Result<MessageResponse, ServiceError> {
        check_confirmation(&req.password, &req.confirm_password)?;

        let stored = self
            .users
            .take_token(&req.token, TokenKind::PasswordReset)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if stored.is_expired() {
            return Err(ServiceError::TokenExpired);
        }

        self.store_password(stored.user_id, req.password).await?;
        tracing::info!(user_id = %stored.user_id, "Password reset completed");

        Ok(MessageResponse::new("Password has been reset"))
    }

    pub async fn update_password(
        &self,
        claims: &SessionClaims,
        req: UpdatePasswordRequest,
    ) -> Result<MessageResponse, ServiceError> {
        check_confirmation(&req.password, &req.confirm_password)?;

        let user = self.user_for(claims).await?;
        self.store_password(user.id, req.password).await?;
        tracing::info!(user_id = %user.id, "Password updated");

        Ok(MessageResponse::new("Password updated"))
    }

    pub async fn current_user(&self, claims: &SessionClaims) -> Result<UserProfile, ServiceError> {
        let user = self.user_for(claims).await?;
        Ok(UserProfile::from(&user))
    }

    pub fn sign_out(&self, claims: &SessionClaims) -> MessageResponse {
        let now = Utc::now().timestamp();
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(claims.jti.clone(), claims.exp);

        tracing::info!(user_id = %claims.sub, "User signed out");
        MessageResponse::new("Signed out")
    }

    /// Claims of a valid, not signed-out session token.
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let claims = self
            .jwt
            .validate_session_token(token)
            .map_err(|_| ServiceError::InvalidToken)?;

        if self.revoked.contains_key(&claims.jti) {
            return Err(ServiceError::SessionRevoked);
        }
        Ok(claims)
    }

    async fn user_for(&self, claims: &SessionClaims) -> Result<User, ServiceError> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidToken)?;
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    async fn store_password(&self, user_id: Uuid, password: String) -> Result<(), ServiceError> {
        let hash = hash_password(&Password::new(password))?;
        self.users
            .set_password_hash(user_id, hash.as_str())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStorage;
    use async_trait::async_trait;
    use secrecy::Secret;
    use service_core::error::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        links: Mutex<Vec<String>>,
    }

    impl Outbox {
        fn last_token(&self) -> String {
            let links = self.links.lock().unwrap();
            let link = links.last().unwrap();
            link.split("token=").nth(1).unwrap().to_string()
        }
    }

    #[async_trait]
    impl EmailProvider for Outbox {
        async fn send_verification_email(&self, _to: &str, link: &str) -> Result<(), AppError> {
            self.links.lock().unwrap().push(link.to_string());
            Ok(())
        }

        async fn send_password_reset_email(&self, _to: &str, link: &str) -> Result<(), AppError> {
            self.links.lock().unwrap().push(link.to_string());
            Ok(())
        }
    }

    fn service() -> (AuthService, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::default());
        let jwt = JwtService::new(
            &Secret::new("secreto-de-pruebas-con-longitud-suficiente".to_string()),
            60,
        )
        .unwrap();
        let auth = AuthService::new(
            Arc::new(InMemoryStorage::new()),
            outbox.clone(),
            jwt,
            "http://localhost:8080/".to_string(),
        );
        (auth, outbox)
    }

    fn sign_up_request(password: &str, confirm: &str) -> SignUpRequest {
        SignUpRequest {
            email: "Ana@Example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            nombres: "Ana".to_string(),
            apellidos: "Gómez".to_string(),
        }
    }

    fn sign_in_request(password: &str) -> SignInRequest {
        SignInRequest {
            email: "ana@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn mismatched_confirmation_is_rejected() {
        let (auth, _) = service();
        let result = auth
            .sign_up(sign_up_request("clave-segura-1", "clave-segura-2"))
            .await;
        assert!(matches!(result, Err(ServiceError::PasswordMismatch)));
    }

    #[tokio::test]
    async fn sign_in_requires_verified_email() {
        let (auth, outbox) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();

        let before = auth.sign_in(sign_in_request("clave-segura-1")).await;
        assert!(matches!(before, Err(ServiceError::EmailNotVerified)));

        auth.verify_email(&outbox.last_token()).await.unwrap();
        let session = auth.sign_in(sign_in_request("clave-segura-1")).await.unwrap();
        assert_eq!(session.user.email, "ana@example.com");
        assert_eq!(session.token.token_type, "Bearer");
    }

    #[tokio::test]
    async fn verification_link_uses_public_url() {
        let (auth, outbox) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();

        let links = outbox.links.lock().unwrap();
        assert!(links[0].starts_with("http://localhost:8080/auth/verify?token="));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (auth, outbox) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();
        auth.verify_email(&outbox.last_token()).await.unwrap();

        let result = auth.sign_in(sign_in_request("otra-clave-123")).await;
        assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (auth, _) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();
        let result = auth
            .sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await;
        assert!(matches!(result, Err(ServiceError::EmailAlreadyRegistered)));
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let (auth, outbox) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();
        auth.verify_email(&outbox.last_token()).await.unwrap();

        auth.request_password_reset(PasswordResetRequest {
            email: "ana@example.com".to_string(),
            redirect_to: Some("http://localhost:8080/reset".to_string()),
        })
        .await
        .unwrap();
        let token = outbox.last_token();

        let confirm = |token: String| PasswordResetConfirm {
            token,
            password: "clave-nueva-22".to_string(),
            confirm_password: "clave-nueva-22".to_string(),
        };
        auth.confirm_password_reset(confirm(token.clone())).await.unwrap();

        assert!(matches!(
            auth.confirm_password_reset(confirm(token)).await,
            Err(ServiceError::InvalidToken)
        ));
        assert!(auth.sign_in(sign_in_request("clave-nueva-22")).await.is_ok());
    }

    #[tokio::test]
    async fn foreign_redirect_is_rejected() {
        let (auth, _) = service();
        let result = auth
            .request_password_reset(PasswordResetRequest {
                email: "nadie@example.com".to_string(),
                redirect_to: Some("https://evil.example.com/reset".to_string()),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidRedirect)));
    }

    #[tokio::test]
    async fn signed_out_session_is_revoked() {
        let (auth, outbox) = service();
        auth.sign_up(sign_up_request("clave-segura-1", "clave-segura-1"))
            .await
            .unwrap();
        auth.verify_email(&outbox.last_token()).await.unwrap();
        let session = auth.sign_in(sign_in_request("clave-segura-1")).await.unwrap();

        let claims = auth.validate_session(&session.token.access_token).unwrap();
        auth.sign_out(&claims);

        assert!(matches!(
            auth.validate_session(&session.token.access_token),
            Err(ServiceError::SessionRevoked)
        ));
    }
}
