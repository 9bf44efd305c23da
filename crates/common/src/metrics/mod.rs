//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming for the bot and worker
//! services.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all SellerScope metrics
pub const METRICS_PREFIX: &str = "sellerscope";

/// Register all metric descriptions
pub fn register_metrics() {
    // Admission metrics
    describe_counter!(
        format!("{}_requests_admitted_total", METRICS_PREFIX),
        Unit::Count,
        "Catalog requests that passed the quota check"
    );

    describe_counter!(
        format!("{}_requests_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Catalog requests refused by the quota check"
    );

    // Scheduling metrics
    describe_counter!(
        format!("{}_crawl_jobs_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Crawl jobs submitted to the backend"
    );

    describe_counter!(
        format!("{}_crawl_queue_saturated_total", METRICS_PREFIX),
        Unit::Count,
        "Submissions refused because the crawl queue was saturated"
    );

    // Stats pipeline metrics
    describe_counter!(
        format!("{}_stats_reports_delivered_total", METRICS_PREFIX),
        Unit::Count,
        "Category stats reports delivered to users"
    );

    describe_counter!(
        format!("{}_stats_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Stats computations deferred because the crawl was not finished"
    );

    // Diff metrics
    describe_counter!(
        format!("{}_diff_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Category snapshot diff runs"
    );

    describe_histogram!(
        format!("{}_diff_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Snapshot diff computation latency in seconds"
    );

    // Delivery metrics
    describe_counter!(
        format!("{}_notifications_sent_total", METRICS_PREFIX),
        Unit::Count,
        "Messages and documents pushed to chats"
    );

    tracing::info!("Metrics registered");
}

/// Record an admission decision
pub fn record_admission(admitted: bool) {
    let name = if admitted {
        format!("{}_requests_admitted_total", METRICS_PREFIX)
    } else {
        format!("{}_requests_rejected_total", METRICS_PREFIX)
    };
    counter!(name).increment(1);
}

/// Record a crawl job submission outcome
pub fn record_submission(submitted: bool) {
    if submitted {
        counter!(format!("{}_crawl_jobs_submitted_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_crawl_queue_saturated_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record a deferred stats computation
pub fn record_stats_retry() {
    counter!(format!("{}_stats_retries_total", METRICS_PREFIX)).increment(1);
}

/// Record a delivered stats report
pub fn record_report_delivered() {
    counter!(format!("{}_stats_reports_delivered_total", METRICS_PREFIX)).increment(1);
}

/// Record one snapshot diff run
pub fn record_diff_run(duration_secs: f64) {
    counter!(format!("{}_diff_runs_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_diff_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record an outbound notification
pub fn record_notification(kind: &'static str) {
    counter!(
        format!("{}_notifications_sent_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}
