use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use tutorhub_common::{AppError, EmailConfig};

#[derive(Clone)]
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, AppError> {
        if !config.enabled {
            return Ok(Self {
                transport: AsyncSmtpTransport::<Tokio1Executor>::unencrypted_localhost(),
                config: config.clone(),
            });
        }

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        // Port 465 speaks implicit TLS; anything else upgrades with STARTTLS.
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        };

        let transport = builder
            .map_err(|e| AppError::Configuration(format!("SMTP relay error: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(10))
            .build();

        Ok(Self {
            transport,
            config: config.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        if !self.config.enabled {
            tracing::info!("Email service disabled, skipping email to: {}", to);
            return Ok(());
        }

        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to send email: {}", e)))?;

        tracing::info!("Email sent successfully to: {}", to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_skips_sending() {
        let service = EmailService::new(&EmailConfig::disabled()).unwrap();
        assert!(!service.is_enabled());

        // Not even the recipient is parsed when sending is disabled.
        service
            .send_email("not-an-address", "Subject", "<p>body</p>")
            .await
            .unwrap();
    }
}
