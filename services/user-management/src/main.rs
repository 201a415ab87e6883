mod config;
mod handlers;
mod models;
mod routes;
mod services;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorhub_auth::JwtService;
use tutorhub_common::{cors_layer, handler_404, shutdown_signal};
use tutorhub_database::{close_pool, create_pool, run_migrations};
use tutorhub_notifications::Notifier;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorhub_user_management=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;

    let app_state = services::AppState {
        db_pool: db_pool.clone(),
        jwt_service: JwtService::new(&config.jwt),
        notifier: Notifier::new(&config.email)?,
        config: config.clone(),
    };

    let app = routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server.cors_origins)),
        )
        .with_state(app_state)
        .fallback(handler_404);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!("User Management Service listening on {}", config.server.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(db_pool).await;
    Ok(())
}
