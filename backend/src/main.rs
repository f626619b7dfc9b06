//! Crag Weather Platform - Backend Server
//!
//! Entry point: loads configuration, connects the subscription store,
//! starts the recurring forecast scan, and serves the HTTP API.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crag_weather_backend::external::mail::MailerClient;
use crag_weather_backend::external::weather::WeatherClient;
use crag_weather_backend::services::catalog::CatalogStore;
use crag_weather_backend::services::scanner::{self, AlertScanner};
use crag_weather_backend::services::subscription::SubscriptionService;
use crag_weather_backend::{create_app, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "cragw_server=debug,crag_weather_backend=debug,tower_http=debug,sqlx=warn"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Crag Weather Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Construct external clients once from the loaded configuration
    let weather = WeatherClient::with_base_url(
        config.weather.api_key.clone(),
        config.weather.api_endpoint.clone(),
    );
    let mailer = MailerClient::new(
        config.mail.api_endpoint.clone(),
        config.mail.api_key.clone(),
        config.mail.sender.clone(),
    );
    let catalog = CatalogStore::new(config.catalog.data_dir.clone());

    let alert_scanner = Arc::new(AlertScanner::new(
        SubscriptionService::new(db_pool.clone()),
        weather.clone(),
        mailer.clone(),
    ));

    // Recurring scan task; detaches when the server exits
    let _scan_task = if config.scanner.enabled {
        tracing::info!(
            "Scheduling forecast scan every {}s",
            config.scanner.interval_secs
        );
        Some(scanner::spawn_recurring(
            Arc::clone(&alert_scanner),
            Duration::from_secs(config.scanner.interval_secs),
        ))
    } else {
        None
    };

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        weather,
        mailer,
        catalog,
        scanner: alert_scanner,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
