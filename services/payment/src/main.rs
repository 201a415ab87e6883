mod config;
mod gateways;
mod handlers;
mod models;
mod routes;
mod services;
mod settlement;
mod signature;

use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorhub_auth::JwtService;
use tutorhub_common::{cors_layer, handler_404, shutdown_signal};
use tutorhub_database::{close_pool, create_pool, run_migrations, PgStore};
use tutorhub_notifications::Notifier;

use crate::config::AppConfig;
use crate::gateways::RazorpayGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorhub_payment=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    if !config.razorpay.has_credentials() {
        tracing::warn!("Razorpay credentials missing; order creation will fail until they are set");
    }

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;

    let app_state = services::AppState {
        db_pool: db_pool.clone(),
        store: Arc::new(PgStore::new(db_pool.clone())),
        gateway: Arc::new(RazorpayGateway::new(&config.razorpay)),
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
    tracing::info!("Payment Service listening on {}", config.server.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(db_pool).await;
    Ok(())
}
