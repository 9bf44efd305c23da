//! SellerScope Bot service
//!
//! The HTTP entry point for everything that reaches the system:
//! - Telegram webhook updates (command routing, inline admission check)
//! - Crawl-finished callbacks from the scraping backend
//! - Health probes
//! Heavy work never happens here; handlers enqueue tasks for the worker.

mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use sellerscope_common::{
    config::AppConfig,
    db::{CatalogStore, DbPool, Repository},
    metrics,
    notify::{Notifier, TelegramNotifier},
    queue::{TaskQueue, TaskSender},
    VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: Arc<dyn CatalogStore>,
    pub notifier: Arc<dyn Notifier>,
    pub sender: Arc<dyn TaskSender>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting SellerScope Bot v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            warn!(error = %e, "Failed to install Prometheus exporter");
        }
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let store = Arc::new(Repository::new(
        db.clone(),
        config.quota.default_daily_limit,
    ));

    // Outbound collaborators
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram.api_base,
        &config.telegram.token,
    )?);
    let queue = Arc::new(TaskQueue::new(config.queue.clone()).await?);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        store,
        notifier,
        sender: queue,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Telegram webhook
        .route("/telegram/webhook", post(handlers::telegram::webhook))
        // Crawl-finished callbacks
        .route("/callback/{kind}", post(handlers::callback::crawl_finished));

    // Rate limit everything that isn't a health probe
    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        router = router.layer(axum::middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            async move { middleware::rate_limit::rate_limit_middleware(req, next, limiter).await }
        }));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .unwrap_or_else(|e| tracing::error!(error = %e, "Failed to listen for ctrl-c"));
    };

    ctrl_c.await;
    info!("Shutdown signal received");
}
