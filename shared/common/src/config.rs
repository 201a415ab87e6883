use serde::{Deserialize, Serialize};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_non_empty("DATABASE_URL"),
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_parse("DATABASE_PORT", 5432),
            username: env_or("DATABASE_USERNAME", "tutorhub_user"),
            password: env_or("DATABASE_PASSWORD", "tutorhub_password"),
            database: env_or("DATABASE_NAME", "tutorhub"),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
            expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
            issuer: env_or("JWT_ISSUER", "tutorhub"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Reads `<PREFIX>_HOST` and `<PREFIX>_PORT`, falling back to `default_port`.
    pub fn from_env(prefix: &str, default_port: u16) -> Self {
        Self {
            host: env_or(&format!("{}_HOST", prefix), "0.0.0.0"),
            port: env_parse(&format!("{}_PORT", prefix), default_port),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub public_base_url: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_parse("SMTP_ENABLED", false),
            smtp_host: env_or("SMTP_HOST", "smtp.gmail.com"),
            smtp_port: env_parse("SMTP_PORT", 587),
            smtp_username: env_or("SMTP_USERNAME", ""),
            smtp_password: env_or("SMTP_PASSWORD", ""),
            from_email: env_or("FROM_EMAIL", "noreply@tutorhub.local"),
            from_name: env_or("FROM_NAME", "TutorHub"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000"),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@tutorhub.local".to_string(),
            from_name: "TutorHub".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Gateway credentials stay optional so that a missing key surfaces as a
/// configuration error at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub base_url: String,
    pub currency: String,
}

impl RazorpayConfig {
    pub fn from_env() -> Self {
        Self {
            key_id: env_non_empty("RAZORPAY_KEY_ID"),
            key_secret: env_non_empty("RAZORPAY_KEY_SECRET"),
            base_url: env_or("RAZORPAY_BASE_URL", "https://api.razorpay.com"),
            currency: env_or("PAYMENT_CURRENCY", "INR"),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.key_id.is_some() && self.key_secret.is_some()
    }
}
