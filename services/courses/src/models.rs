use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use tutorhub_common::DemoClassStatus;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn validate_weekdays(days: &Vec<String>) -> Result<(), ValidationError> {
    if days.iter().all(|day| WEEKDAYS.contains(&day.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("weekday"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub grade: Option<String>,
    pub schedule_time: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_weekdays")]
    pub schedule_days: Vec<String>,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    /// Classes granted up front; later credits come only from payments.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub no_of_classes: i32,
    pub price_per_class: Decimal,
    pub teacher_price_per_class: Decimal,
    #[validate(url)]
    pub join_link: Option<String>,
    #[validate(url)]
    pub classroom_link: Option<String>,
}

/// Class counters are not editable; only class completion and payment settlement move them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub grade: Option<String>,
    pub schedule_time: Option<String>,
    #[validate(custom = "validate_weekdays")]
    pub schedule_days: Option<Vec<String>>,
    pub teacher_id: Option<Uuid>,
    pub price_per_class: Option<Decimal>,
    pub teacher_price_per_class: Option<Decimal>,
    #[validate(url)]
    pub join_link: Option<String>,
    #[validate(url)]
    pub classroom_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteClassRequest {
    #[validate(length(min = 1, max = 500))]
    pub topic: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(url)]
    pub homework_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseEarning {
    pub course_id: Uuid,
    pub title: String,
    pub classes_taught: i32,
    pub teacher_price_per_class: Decimal,
    pub earned: Decimal,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    pub courses: Vec<CourseEarning>,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDemoClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub topic: Option<String>,
    pub location: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDemoClassStatusRequest {
    pub status: DemoClassStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}
