use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use tutorhub_common::UserRole;
use tutorhub_database::User;

#[derive(Debug, Deserialize, Validate)]
pub struct RequestOtpRequest {
    #[validate(email)]
    pub email: String,

    /// Required the first time an email is seen.
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,

    #[validate(length(min = 7, max = 20))]
    pub mobile: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OtpRequestedResponse {
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub is_new_user: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub mobile: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 20))]
    pub mobile: Option<String>,
    pub role: UserRole,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub is_verified: Option<bool>,
    #[serde(flatten)]
    #[validate]
    pub profile: UpdateProfileRequest,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
}
