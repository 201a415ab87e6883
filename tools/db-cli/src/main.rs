use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use tutorhub_common::DatabaseConfig;
use tutorhub_database::{close_pool, create_pool, MigrationRunner};
use validator::validate_email;

#[derive(Parser)]
#[command(name = "db-cli")]
#[command(about = "TutorHub Database CLI Tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Connection {
    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,
}

impl Connection {
    fn config(self) -> DatabaseConfig {
        let mut config = DatabaseConfig::from_env();
        if let Some(url) = self.database_url {
            config.url = Some(url);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(flatten)]
        connection: Connection,
    },
    /// Check migration status
    Status {
        #[command(flatten)]
        connection: Connection,
    },
    /// Create the first admin account
    SeedAdmin {
        #[command(flatten)]
        connection: Connection,
        /// Email the admin signs in with
        #[arg(long, value_parser = parse_email)]
        email: String,
        #[arg(long, default_value = "Administrator")]
        full_name: String,
    },
}

fn parse_email(value: &str) -> Result<String, String> {
    let email = value.trim().to_lowercase();
    if validate_email(email.as_str()) {
        Ok(email)
    } else {
        Err(format!("'{}' is not an email address", value))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    match Cli::parse().command {
        Commands::Migrate { connection } => {
            let pool = create_pool(&connection.config())
                .await
                .context("failed to connect to the database")?;
            let runner = MigrationRunner::new(pool.clone());

            runner.run_all_migrations().await?;
            println!("✅ Migrations completed successfully");
            close_pool(pool).await;
        }
        Commands::Status { connection } => {
            let pool = create_pool(&connection.config())
                .await
                .context("failed to connect to the database")?;
            let runner = MigrationRunner::new(pool.clone());

            let status = runner.check_migration_status().await?;
            println!("📊 {}", status);
            if status.is_up_to_date {
                println!("✅ Database is up to date");
            } else {
                println!("⚠️  Database needs migration");
            }
            close_pool(pool).await;
        }
        Commands::SeedAdmin {
            connection,
            email,
            full_name,
        } => {
            let pool = create_pool(&connection.config())
                .await
                .context("failed to connect to the database")?;
            let runner = MigrationRunner::new(pool.clone());

            runner.run_all_migrations().await?;
            if runner.seed_admin(&email, full_name.trim()).await? {
                println!("✅ Admin {} created; sign in with an OTP", email);
            } else {
                println!("ℹ️  A user with email {} already exists", email);
            }
            close_pool(pool).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_admin_email_is_validated_and_normalized() {
        let cli = Cli::try_parse_from(["db-cli", "seed-admin", "--email", " Admin@TutorHub.Example "])
            .unwrap();
        match cli.command {
            Commands::SeedAdmin { email, full_name, .. } => {
                assert_eq!(email, "admin@tutorhub.example");
                assert_eq!(full_name, "Administrator");
            }
            _ => panic!("expected seed-admin"),
        }

        for bad in ["admin", "admin@", "@tutorhub.example", "a b@tutorhub.example"] {
            assert!(
                Cli::try_parse_from(["db-cli", "seed-admin", "--email", bad]).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }
}
