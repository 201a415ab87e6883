use std::collections::HashSet;

use sqlx::{migrate::Migrate, PgPool};
use tutorhub_common::{AppError, UserRole};
use uuid::Uuid;

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");

        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        let applied: HashSet<i64> = conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|migration| migration.version)
            .collect();

        let total = migrator.iter().count();
        let pending = migrator
            .iter()
            .filter(|migration| !applied.contains(&migration.version))
            .count();

        Ok(MigrationStatus {
            total,
            applied: total - pending,
            pending,
            is_up_to_date: pending == 0,
        })
    }

    /// Creates the first admin account. Sign-in happens through the OTP flow like everyone else.
    pub async fn seed_admin(&self, email: &str, full_name: &str) -> Result<bool, AppError> {
        let admin_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        if admin_exists {
            tracing::info!("Admin user {} already exists", email);
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO users (user_id, full_name, email, role, is_verified)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(email)
        .bind(UserRole::Admin.as_str())
        .bind(true)
        .execute(&self.pool)
        .await?;

        tracing::info!("Admin user created: {}", email);
        Ok(true)
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrations: {}/{} applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}
