//! SellerScope Worker
//!
//! Processes background tasks from the SQS queue:
//! 1. Schedules category-export crawls for admitted requests
//! 2. Computes and delivers category statistics when crawls finish
//! 3. Sends quota-count and quota-recovery messages
//! 4. Diffs category-listing snapshots and notifies subscribers

mod tasks;

use crate::tasks::TaskContext;
use sellerscope_common::{
    config::AppConfig,
    crawl::HttpCrawlClient,
    db::{DbPool, Repository},
    metrics,
    notify::TelegramNotifier,
    queue::TaskQueue,
    track::{AmplitudeTracker, NoopTracker, Tracker},
    VERSION,
};
use std::sync::Arc;
use tracing::{error, info, warn, Level};

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

    info!("Starting SellerScope Worker v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
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
    let store = Arc::new(Repository::new(db, config.quota.default_daily_limit));

    // Initialize collaborators
    let crawl = Arc::new(HttpCrawlClient::new(config.crawl.clone())?);
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram.api_base,
        &config.telegram.token,
    )?);
    let tracker: Arc<dyn Tracker> = match config.tracking.amplitude_api_key {
        Some(ref key) => Arc::new(AmplitudeTracker::new(
            &config.tracking.amplitude_endpoint,
            key,
        )),
        None => Arc::new(NoopTracker),
    };

    // Initialize the task queue
    let queue = Arc::new(TaskQueue::new(config.queue.clone()).await?);

    let ctx = TaskContext {
        config: config.clone(),
        store,
        crawl,
        notifier,
        tracker,
        sender: queue.clone(),
    };

    info!("Worker ready, starting queue polling...");

    // Circuit breaker state
    let mut consecutive_failures = 0u32;
    const MAX_FAILURES: u32 = 5;
    const CIRCUIT_BREAK_DURATION: std::time::Duration = std::time::Duration::from_secs(30);

    // Start polling loop
    loop {
        // Circuit breaker check
        if consecutive_failures >= MAX_FAILURES {
            warn!(
                failures = consecutive_failures,
                "Circuit breaker open, pausing..."
            );
            tokio::time::sleep(CIRCUIT_BREAK_DURATION).await;
            consecutive_failures = 0;
            info!("Circuit breaker reset, resuming...");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            result = queue.receive() => {
                match result {
                    Ok(received) => {
                        for task in received {
                            info!(task = ?task.message, "Received task");

                            match tasks::dispatch(&ctx, task.message.clone()).await {
                                Ok(()) => {
                                    consecutive_failures = 0;
                                    if let Err(e) = queue.delete(&task.receipt_handle).await {
                                        error!(error = %e, "Failed to delete task");
                                    }
                                }
                                Err(e) => {
                                    consecutive_failures += 1;
                                    error!(
                                        task = ?task.message,
                                        error = %e,
                                        failures = consecutive_failures,
                                        "Failed to process task"
                                    );
                                    // Task will be re-delivered after the
                                    // visibility timeout.
                                }
                            }
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(error = %e, "Failed to receive tasks from queue");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    info!("Worker shutting down");
    Ok(())
}
