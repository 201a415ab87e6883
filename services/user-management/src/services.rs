use axum::extract::FromRef;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tutorhub_auth::{Claims, JwtService, OtpService};
use tutorhub_common::{AppError, UserRole};
use tutorhub_database::User;
use tutorhub_notifications::{Notification, Notifier};

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub notifier: Notifier,
    pub config: AppConfig,
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_service.clone()
    }
}

/// Wrong codes allowed before the outstanding OTP is discarded.
const MAX_OTP_ATTEMPTS: i32 = 5;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("A user with this email already exists".to_string())
        }
        _ => AppError::Database(e),
    }
}

pub struct UserService {
    db_pool: PgPool,
    jwt_service: JwtService,
    notifier: Notifier,
    config: AppConfig,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            jwt_service: state.jwt_service.clone(),
            notifier: state.notifier.clone(),
            config: state.config.clone(),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    /// Signup-or-login: unknown emails become unverified students.
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn request_otp(
        &self,
        request: RequestOtpRequest,
    ) -> Result<OtpRequestedResponse, AppError> {
        let email = normalize_email(&request.email);

        let (user, is_new_user) = match self.find_by_email(&email).await? {
            Some(user) => (user, false),
            None => {
                let full_name = request
                    .full_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("full_name is required for new users".to_string())
                    })?;

                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (user_id, full_name, email, mobile, role)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(full_name)
                .bind(&email)
                .bind(&request.mobile)
                .bind(UserRole::Student.as_str())
                .fetch_one(&self.db_pool)
                .await
                .map_err(email_conflict)?;

                tracing::info!("New student registered: {}", user.user_id);
                (user, true)
            }
        };

        let otp = OtpService::issue(self.config.otp_ttl_minutes)?;

        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = $2, otp_expires_at = $3, otp_failed_attempts = 0, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id)
        .bind(&otp.hash)
        .bind(otp.expires_at)
        .execute(&self.db_pool)
        .await?;

        if !self.notifier.is_enabled() {
            tracing::warn!("Email is disabled; the OTP for user {} was not delivered", user.user_id);
        }

        self.notifier
            .send(
                &email,
                &Notification::Otp {
                    name: user.full_name.clone(),
                    code: otp.code,
                    ttl_minutes: self.config.otp_ttl_minutes,
                },
            )
            .await?;

        Ok(OtpRequestedResponse {
            email,
            expires_at: otp.expires_at,
            is_new_user,
        })
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&request.email);

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or OTP".to_string()))?;

        let Some(otp_hash) = user.otp_hash.as_deref() else {
            return Err(AppError::Authentication("No OTP has been requested".to_string()));
        };
        if let Err(e) = OtpService::verify(&request.otp, Some(otp_hash), user.otp_expires_at) {
            self.record_failed_attempt(user.user_id, otp_hash).await?;
            return Err(e);
        }

        // Matching on the hash makes the code single use under concurrent verifies.
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET otp_hash = NULL, otp_expires_at = NULL, otp_failed_attempts = 0,
                is_verified = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND otp_hash = $2
            RETURNING *
            "#,
        )
        .bind(user.user_id)
        .bind(otp_hash)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::Authentication("OTP has already been used".to_string()))?;

        let role = user.role()?;
        let claims = Claims::for_user(&user, role, &self.config.jwt);
        let token = self.jwt_service.generate_token(&claims)?;

        tracing::info!("User {} signed in as {}", user.user_id, role);

        Ok(AuthResponse {
            token,
            expires_at: Utc::now() + Duration::hours(self.config.jwt.expiration_hours as i64),
            user,
        })
    }

    /// Counts a wrong or expired code; the OTP is discarded once the limit is hit.
    async fn record_failed_attempt(&self, user_id: Uuid, otp_hash: &str) -> Result<(), AppError> {
        let attempts: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET otp_failed_attempts = otp_failed_attempts + 1,
                otp_hash = CASE WHEN otp_failed_attempts + 1 >= $3 THEN NULL ELSE otp_hash END,
                otp_expires_at = CASE WHEN otp_failed_attempts + 1 >= $3 THEN NULL ELSE otp_expires_at END,
                updated_at = NOW()
            WHERE user_id = $1 AND otp_hash = $2
            RETURNING otp_failed_attempts
            "#,
        )
        .bind(user_id)
        .bind(otp_hash)
        .bind(MAX_OTP_ATTEMPTS)
        .fetch_optional(&self.db_pool)
        .await?;

        if attempts.is_some_and(|n| n >= MAX_OTP_ATTEMPTS) {
            tracing::warn!("OTP for user {} discarded after {} failed attempts", user_id, MAX_OTP_ATTEMPTS);
        }
        Ok(())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        self.update_user(
            user_id,
            UpdateUserRequest {
                role: None,
                is_verified: None,
                profile: request,
            },
        )
        .await
    }

    pub async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::TEXT IS NULL OR role = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.db_pool)
        .await?;
        Ok(users)
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (user_id, full_name, email, mobile, role, qualification, experience, subjects, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.full_name.trim())
        .bind(normalize_email(&request.email))
        .bind(&request.mobile)
        .bind(request.role.as_str())
        .bind(&request.qualification)
        .bind(&request.experience)
        .bind(&request.subjects)
        .bind(&request.address)
        .fetch_one(&self.db_pool)
        .await
        .map_err(email_conflict)?;

        tracing::info!("Admin created {} {}", user.role, user.user_id);
        Ok(user)
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<User, AppError> {
        let profile = request.profile;

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                mobile = COALESCE($3, mobile),
                qualification = COALESCE($4, qualification),
                experience = COALESCE($5, experience),
                subjects = COALESCE($6, subjects),
                address = COALESCE($7, address),
                date_of_birth = COALESCE($8, date_of_birth),
                role = COALESCE($9, role),
                is_verified = COALESCE($10, is_verified),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(profile.full_name.as_deref().map(str::trim))
        .bind(&profile.mobile)
        .bind(&profile.qualification)
        .bind(&profile.experience)
        .bind(&profile.subjects)
        .bind(&profile.address)
        .bind(profile.date_of_birth)
        .bind(request.role.map(|r| r.as_str()))
        .bind(request.is_verified)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tutorhub_common::{DatabaseConfig, EmailConfig, JwtConfig, ServerConfig};
    use tutorhub_database::{create_pool, run_migrations};

    async fn test_service() -> Option<UserService> {
        // Skip test if no database is available
        if std::env::var("DATABASE_URL").is_err() {
            println!("Skipping database test - DATABASE_URL not set");
            return None;
        }

        let database = DatabaseConfig::from_env();
        let pool = create_pool(&database)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let config = AppConfig {
            server: ServerConfig::from_env("USER_SERVICE_TEST", 0),
            database,
            jwt: JwtConfig {
                secret: "service-test-secret".to_string(),
                expiration_hours: 1,
                issuer: "tutorhub".to_string(),
            },
            email: EmailConfig::disabled(),
            otp_ttl_minutes: 10,
        };
        Some(UserService::new(&AppState {
            db_pool: pool,
            jwt_service: JwtService::new(&config.jwt),
            notifier: Notifier::disabled().expect("Failed to build notifier"),
            config,
        }))
    }

    /// Registers a student and replaces the emailed OTP with one whose code is known.
    async fn student_with_known_otp(service: &UserService) -> (String, String) {
        let email = format!("{}@example.com", Uuid::new_v4());
        service
            .request_otp(RequestOtpRequest {
                email: email.clone(),
                full_name: Some("Otp Student".to_string()),
                mobile: None,
            })
            .await
            .expect("Failed to request OTP");

        let otp = OtpService::issue(10).unwrap();
        sqlx::query("UPDATE users SET otp_hash = $2, otp_expires_at = $3 WHERE email = $1")
            .bind(&email)
            .bind(&otp.hash)
            .bind(otp.expires_at)
            .execute(&service.db_pool)
            .await
            .expect("Failed to store test OTP");
        (email, otp.code)
    }

    fn wrong_code(code: &str) -> String {
        if code == "000000" { "111111" } else { "000000" }.to_string()
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_undelivered_otp_is_not_logged() {
        let Some(service) = test_service().await else { return };
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();

        let email = format!("{}@example.com", Uuid::new_v4());
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            service
                .request_otp(RequestOtpRequest {
                    email: email.clone(),
                    full_name: Some("Quiet Student".to_string()),
                    mobile: None,
                })
                .await
                .unwrap();
        }

        let user = service.find_by_email(&email).await.unwrap().unwrap();
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("was not delivered"));

        let bytes = output.as_bytes();
        for window in bytes.windows(6) {
            if window.iter().all(u8::is_ascii_digit) {
                let candidate = std::str::from_utf8(window).unwrap();
                assert!(
                    OtpService::verify(candidate, user.otp_hash.as_deref(), user.otp_expires_at)
                        .is_err(),
                    "OTP appeared in the logs"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_otp_is_single_use() {
        let Some(service) = test_service().await else { return };
        let (email, code) = student_with_known_otp(&service).await;

        let auth = service
            .verify_otp(VerifyOtpRequest {
                email: email.clone(),
                otp: code.clone(),
            })
            .await
            .unwrap();
        assert!(auth.user.is_verified);
        assert!(auth.user.otp_hash.is_none());
        assert!(auth.user.otp_expires_at.is_none());

        let err = service
            .verify_otp(VerifyOtpRequest { email, otp: code })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_otp_discarded_after_repeated_misses() {
        let Some(service) = test_service().await else { return };
        let (email, code) = student_with_known_otp(&service).await;

        for _ in 0..MAX_OTP_ATTEMPTS {
            let err = service
                .verify_otp(VerifyOtpRequest {
                    email: email.clone(),
                    otp: wrong_code(&code),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Authentication(_)));
        }

        let user = service.find_by_email(&email).await.unwrap().unwrap();
        assert!(user.otp_hash.is_none());
        assert_eq!(user.otp_failed_attempts, MAX_OTP_ATTEMPTS);

        // The correct code no longer works once the OTP is discarded.
        let err = service
            .verify_otp(VerifyOtpRequest { email: email.clone(), otp: code })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        let user = service.find_by_email(&email).await.unwrap().unwrap();
        assert!(!user.is_verified);
    }
}
