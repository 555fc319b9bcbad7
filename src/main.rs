//! LoanFlow Backend Server
//!
//! Loan-origination workflow API: borrowers submit applications, riders
//! verify them in the field, and admins review, approve and disburse.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use loanflow_server::auth::jwt::TokenVerifier;
use loanflow_server::config::Config;
use loanflow_server::identity::HttpIdentityProvider;
use loanflow_server::loan_service::LoanService;
use loanflow_server::notification_service::NotificationService;
use loanflow_server::notifier::Notifier;
use loanflow_server::rider_service::RiderService;
use loanflow_server::routes;
use loanflow_server::state::AppState;
use loanflow_server::store::postgres::PgStore;
use loanflow_server::store::Store;
use loanflow_server::{db, middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = %config.environment.as_str(), "Starting LoanFlow server");

    // Connect to the database and bring the schema up to date
    let pool = db::create_pool(&config)
        .await
        .context("Database connection failed")?;
    db::run_migrations(&pool).await.context("Migration failed")?;

    // Wire up the explicitly constructed collaborators; no ambient globals
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let notifier = Notifier::new(store.clone());
    let identity = Arc::new(HttpIdentityProvider::new(
        config.identity_api_url.clone(),
        config.identity_service_key.clone(),
    ));
    let verifier = Arc::new(TokenVerifier::new(config.jwt_secret.clone()));

    let loan_service = LoanService::new(store.clone(), notifier.clone());
    let rider_service = RiderService::new(
        store.clone(),
        notifier.clone(),
        identity,
        config.workflow,
    );
    let notification_service = NotificationService::new(store.clone());

    let app_state = AppState::new(loan_service, rider_service, notification_service, verifier);

    // Create the app router
    let app = routes::app_router(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins.filter(|s| !s.is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
