use tutorhub_common::{DatabaseConfig, EmailConfig, JwtConfig, RazorpayConfig, ServerConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub razorpay: RazorpayConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env("PAYMENT_SERVICE", 8003),
            database: DatabaseConfig::from_env(),
            jwt: JwtConfig::from_env(),
            email: EmailConfig::from_env(),
            razorpay: RazorpayConfig::from_env(),
        }
    }
}
