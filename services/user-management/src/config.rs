use tutorhub_common::{DatabaseConfig, EmailConfig, JwtConfig, ServerConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    /// Lifetime of an issued OTP.
    pub otp_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env("USER_SERVICE", 8001),
            database: DatabaseConfig::from_env(),
            jwt: JwtConfig::from_env(),
            email: EmailConfig::from_env(),
            otp_ttl_minutes: std::env::var("OTP_TTL_MINUTES")
                .ok()
                .and_then(|value| value.parse().ok())
                .filter(|minutes: &i64| *minutes > 0)
                .unwrap_or(10),
        }
    }
}
