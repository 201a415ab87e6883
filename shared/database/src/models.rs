use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use tutorhub_common::{AppError, DemoClassStatus, PaymentStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub role: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_failed_attempts: i32,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub subjects: Vec<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Result<UserRole, AppError> {
        self.role.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub grade: Option<String>,
    pub schedule_time: Option<String>,
    pub schedule_days: Vec<String>,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    /// Classes the student still has paid for.
    pub no_of_classes: i32,
    pub price_per_class: Decimal,
    /// Classes the teacher has taught on this course.
    pub no_of_class_teacher: i32,
    pub teacher_price_per_class: Decimal,
    pub join_link: Option<String>,
    pub classroom_link: Option<String>,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompletedClass {
    pub completed_class_id: Uuid,
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub topic: String,
    pub duration_minutes: Option<i32>,
    pub homework_url: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompletedClass {
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub topic: String,
    pub duration_minutes: Option<i32>,
    pub homework_url: Option<String>,
}

/// One payment attempt in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub amount: Decimal,
    pub classes_purchased: i32,
    pub currency: String,
    pub status: String,
    pub gateway: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn status(&self) -> Result<PaymentStatus, AppError> {
        self.status.parse()
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub order_id: String,
    pub amount: Decimal,
    pub classes_purchased: i32,
    pub currency: String,
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DemoClass {
    pub demo_class_id: Uuid,
    pub student_id: Option<Uuid>,
    pub student_name: String,
    pub student_email: String,
    pub student_mobile: Option<String>,
    pub subject: String,
    pub topic: Option<String>,
    pub location: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DemoClass {
    pub fn status(&self) -> Result<DemoClassStatus, AppError> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseMessage {
    pub message_id: Uuid,
    pub course_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
