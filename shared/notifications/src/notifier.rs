use tutorhub_common::{AppError, EmailConfig};

use crate::email::EmailService;
use crate::templates::{Notification, TemplateEngine};

/// Renders a [`Notification`] and hands it to the email transport.
#[derive(Clone)]
pub struct Notifier {
    email: EmailService,
    templates: TemplateEngine,
}

impl Notifier {
    pub fn new(config: &EmailConfig) -> Result<Self, AppError> {
        Ok(Self {
            email: EmailService::new(config)?,
            templates: TemplateEngine::new(&config.public_base_url)?,
        })
    }

    pub fn disabled() -> Result<Self, AppError> {
        Self::new(&EmailConfig::disabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.email.is_enabled()
    }

    pub async fn send(&self, to: &str, notification: &Notification) -> Result<(), AppError> {
        let rendered = self.templates.render(notification)?;
        self.email.send_email(to, &rendered.subject, &rendered.html).await
    }

    /// Sends in the background. Failures are logged and never reach the caller.
    pub fn dispatch(&self, to: String, notification: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&to, &notification).await {
                tracing::warn!("Failed to deliver notification to {}: {}", to, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_accepts_every_notification() {
        let notifier = Notifier::disabled().unwrap();
        assert!(!notifier.is_enabled());
        notifier
            .send(
                "student@example.com",
                &Notification::PaymentSucceeded {
                    name: "Ravi".to_string(),
                    course_title: "Algebra".to_string(),
                    amount: "2500.00".to_string(),
                    currency: "INR".to_string(),
                    classes: 5,
                    remaining: 7,
                    payment_id: "pay_1".to_string(),
                },
            )
            .await
            .unwrap();

        notifier.dispatch(
            "teacher@example.com".to_string(),
            Notification::Otp {
                name: "Asha".to_string(),
                code: "123456".to_string(),
                ttl_minutes: 10,
            },
        );
    }
}
