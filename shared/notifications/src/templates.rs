use handlebars::Handlebars;
use serde_json::json;

use tutorhub_common::AppError;

const OTP_TEMPLATE: &str = r#"<div style="font-family: sans-serif">
<h2>Hello {{name}},</h2>
<p>Your TutorHub verification code is:</p>
<p style="font-size: 28px; letter-spacing: 6px"><strong>{{code}}</strong></p>
<p>The code expires in {{ttl_minutes}} minutes. If you did not request it, ignore this email.</p>
</div>"#;

const COURSE_ASSIGNED_TEMPLATE: &str = r#"<div style="font-family: sans-serif">
<h2>Hello {{name}},</h2>
<p>You have been enrolled as the <strong>{{role}}</strong> for <strong>{{course_title}}</strong>.</p>
{{#if schedule}}<p>Schedule: {{schedule}}</p>{{/if}}
{{#if join_link}}<p>Join link: <a href="{{join_link}}">{{join_link}}</a></p>{{/if}}
<p><a href="{{dashboard_url}}">Open your dashboard</a></p>
</div>"#;

const PAYMENT_SUCCEEDED_TEMPLATE: &str = r#"<div style="font-family: sans-serif">
<h2>Thank you, {{name}}!</h2>
<p>We received your payment of <strong>{{amount}} {{currency}}</strong> for <strong>{{course_title}}</strong>.</p>
<p>{{classes}} classes were added. You now have {{remaining}} classes remaining.</p>
<p>Reference: {{payment_id}}</p>
</div>"#;

/// Emails the platform sends. Each variant maps to one static template.
#[derive(Debug, Clone)]
pub enum Notification {
    Otp {
        name: String,
        code: String,
        ttl_minutes: i64,
    },
    CourseAssigned {
        name: String,
        role: String,
        course_title: String,
        schedule: Option<String>,
        join_link: Option<String>,
    },
    PaymentSucceeded {
        name: String,
        course_title: String,
        amount: String,
        currency: String,
        classes: i32,
        remaining: i32,
        payment_id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    public_base_url: String,
}

impl TemplateEngine {
    pub fn new(public_base_url: &str) -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for (name, template) in [
            ("otp", OTP_TEMPLATE),
            ("course_assigned", COURSE_ASSIGNED_TEMPLATE),
            ("payment_succeeded", PAYMENT_SUCCEEDED_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, template)
                .map_err(|e| AppError::Internal(format!("Template registration error: {}", e)))?;
        }

        Ok(Self {
            handlebars,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn render(&self, notification: &Notification) -> Result<RenderedEmail, AppError> {
        let (template, subject, data) = match notification {
            Notification::Otp {
                name,
                code,
                ttl_minutes,
            } => (
                "otp",
                "Your TutorHub verification code".to_string(),
                json!({ "name": name, "code": code, "ttl_minutes": ttl_minutes }),
            ),
            Notification::CourseAssigned {
                name,
                role,
                course_title,
                schedule,
                join_link,
            } => (
                "course_assigned",
                format!("You have been enrolled in {}", course_title),
                json!({
                    "name": name,
                    "role": role,
                    "course_title": course_title,
                    "schedule": schedule,
                    "join_link": join_link,
                    "dashboard_url": format!("{}/dashboard", self.public_base_url),
                }),
            ),
            Notification::PaymentSucceeded {
                name,
                course_title,
                amount,
                currency,
                classes,
                remaining,
                payment_id,
            } => (
                "payment_succeeded",
                format!("Payment received for {}", course_title),
                json!({
                    "name": name,
                    "course_title": course_title,
                    "amount": amount,
                    "currency": currency,
                    "classes": classes,
                    "remaining": remaining,
                    "payment_id": payment_id,
                }),
            ),
        };

        let html = self
            .handlebars
            .render(template, &data)
            .map_err(|e| AppError::Internal(format!("Template rendering error: {}", e)))?;

        Ok(RenderedEmail { subject, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code() {
        let engine = TemplateEngine::new("https://tutorhub.example/").unwrap();
        let email = engine
            .render(&Notification::Otp {
                name: "Meera".to_string(),
                code: "482913".to_string(),
                ttl_minutes: 10,
            })
            .unwrap();

        assert_eq!(email.subject, "Your TutorHub verification code");
        assert!(email.html.contains("482913"));
        assert!(email.html.contains("10 minutes"));
    }

    #[test]
    fn test_course_assignment_links_dashboard_and_escapes_names() {
        let engine = TemplateEngine::new("https://tutorhub.example/").unwrap();
        let email = engine
            .render(&Notification::CourseAssigned {
                name: "<script>".to_string(),
                role: "teacher".to_string(),
                course_title: "Physics".to_string(),
                schedule: None,
                join_link: Some("https://meet.example/abc".to_string()),
            })
            .unwrap();

        assert!(email.html.contains("https://tutorhub.example/dashboard"));
        assert!(email.html.contains("https://meet.example/abc"));
        assert!(!email.html.contains("<script>"));
        assert!(!email.html.contains("Schedule:"));
    }
}
