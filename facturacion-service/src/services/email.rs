use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::time::Duration;

use crate::config::SmtpConfig;

/// Delivers account e-mails. Links arrive fully built.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, link: &str) -> Result<(), AppError>;

    async fn send_password_reset_email(&self, to_email: &str, link: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid SMTP host: {}", e)))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP e-mail service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_verification_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        let plain = format!(
            "Bienvenido. Confirme su correo abriendo este enlace:\n\n{}\n\nEl enlace vence en 24 horas.",
            link
        );
        let html = format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Confirme su correo</h2>
<p>Abra el siguiente enlace para activar su cuenta:</p>
<p><a href="{link}">{link}</a></p>
<p>El enlace vence en 24 horas.</p>
</body></html>"#
        );
        self.send_email(to_email, "Confirme su correo", plain, html)
            .await
    }

    async fn send_password_reset_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        let plain = format!(
            "Para restablecer su contraseña abra este enlace:\n\n{}\n\nEl enlace vence en 1 hora. Si no lo solicitó, ignore este mensaje.",
            link
        );
        let html = format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Restablecer contraseña</h2>
<p><a href="{link}">{link}</a></p>
<p>El enlace vence en 1 hora. Si no lo solicitó, ignore este mensaje.</p>
</body></html>"#
        );
        self.send_email(to_email, "Restablecer contraseña", plain, html)
            .await
    }
}

/// Writes links to the log instead of sending mail. Used when SMTP is not
/// configured.
#[derive(Clone, Default)]
pub struct LogEmailService;

#[async_trait]
impl EmailProvider for LogEmailService {
    async fn send_verification_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        tracing::info!(to = %to_email, link = %link, "Verification e-mail (not sent, SMTP disabled)");
        Ok(())
    }

    async fn send_password_reset_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        tracing::info!(to = %to_email, link = %link, "Password reset e-mail (not sent, SMTP disabled)");
        Ok(())
    }
}
