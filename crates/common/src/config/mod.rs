//! Configuration management for SellerScope services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Task queue configuration (SQS)
    pub queue: QueueConfig,

    /// Crawl backend configuration
    pub crawl: CrawlConfig,

    /// Telegram Bot API configuration
    pub telegram: TelegramConfig,

    /// Analytics tracking configuration
    pub tracking: TrackingConfig,

    /// Request quota configuration
    pub quota: QuotaConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// SQS task queue URL
    pub task_queue_url: Option<String>,

    /// Maximum messages to receive per poll
    #[serde(default = "default_queue_batch_size")]
    pub batch_size: i32,

    /// Long polling timeout in seconds
    #[serde(default = "default_queue_poll_timeout")]
    pub poll_timeout_secs: i32,

    /// Visibility timeout in seconds
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Crawl backend API base URL
    #[serde(default = "default_crawl_api_url")]
    pub api_url: String,

    /// Crawl backend API key
    pub api_key: Option<String>,

    /// Crawl backend project id
    #[serde(default = "default_crawl_project_id")]
    pub project_id: String,

    /// Spider name for Wildberries category exports
    #[serde(default = "default_wb_spider")]
    pub wb_spider: String,

    /// Spider name for Ozon category exports
    #[serde(default = "default_ozon_spider")]
    pub ozon_spider: String,

    /// Numeric spider id embedded in WB job keys
    #[serde(default = "default_wb_spider_id")]
    pub wb_spider_id: String,

    /// Numeric spider id embedded in Ozon job keys
    #[serde(default = "default_ozon_spider_id")]
    pub ozon_spider_id: String,

    /// Spider name for the periodic category-listing crawl
    #[serde(default = "default_category_list_spider")]
    pub category_list_spider: String,

    /// Maximum queued (pending + running) jobs before submissions are refused
    #[serde(default = "default_scheduled_jobs_threshold")]
    pub scheduled_jobs_threshold: u64,

    /// Base URL for job-finished callbacks, without the flavor suffix
    pub job_finished_callback_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub token: String,

    /// Bot API base URL (override for testing)
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Amplitude API key; tracking is disabled when unset
    pub amplitude_api_key: Option<String>,

    /// Amplitude HTTP API endpoint
    #[serde(default = "default_amplitude_endpoint")]
    pub amplitude_endpoint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Daily catalog request limit assigned to new users
    #[serde(default = "default_daily_limit")]
    pub default_daily_limit: i32,

    /// Sliding lookback window in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    /// Extra delay added to the quota-recovery recheck, in seconds
    #[serde(default = "default_recheck_buffer")]
    pub recheck_buffer_secs: i64,

    /// Fixed delay between stats-computation retries, in seconds
    #[serde(default = "default_stats_retry_delay")]
    pub stats_retry_delay_secs: i32,

    /// Maximum stats-computation attempts before giving up
    #[serde(default = "default_stats_max_attempts")]
    pub stats_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second on the HTTP surface
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_queue_batch_size() -> i32 {
    10
}
fn default_queue_poll_timeout() -> i32 {
    20
}
fn default_visibility_timeout() -> i32 {
    60
}
fn default_crawl_api_url() -> String {
    "https://app.scrapinghub.com".to_string()
}
fn default_crawl_project_id() -> String {
    "414324".to_string()
}
fn default_wb_spider() -> String {
    "wb".to_string()
}
fn default_ozon_spider() -> String {
    "ozon".to_string()
}
fn default_wb_spider_id() -> String {
    "1".to_string()
}
fn default_ozon_spider_id() -> String {
    "2".to_string()
}
fn default_category_list_spider() -> String {
    "wb_categories".to_string()
}
fn default_scheduled_jobs_threshold() -> u64 {
    1
}
fn default_crawl_timeout() -> u64 {
    30
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_amplitude_endpoint() -> String {
    "https://api.amplitude.com/2/httpapi".to_string()
}
fn default_daily_limit() -> i32 {
    5
}
fn default_window_hours() -> i64 {
    24
}
fn default_recheck_buffer() -> i64 {
    60
}
fn default_stats_retry_delay() -> i32 {
    10
}
fn default_stats_max_attempts() -> u32 {
    6
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_json_logging() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_service_name() -> String {
    "sellerscope".to_string()
}
fn default_rate_limit() -> u32 {
    25
}
fn default_burst() -> u32 {
    50
}
fn default_rate_limit_enabled() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Sliding quota window as a chrono Duration
    pub fn quota_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.quota.window_hours)
    }

    /// Delay before the deferred quota-recovery recheck fires
    pub fn recheck_delay(&self) -> chrono::Duration {
        self.quota_window() + chrono::Duration::seconds(self.quota.recheck_buffer_secs)
    }

    /// Job-finished callback URL for the given crawl flavor
    pub fn callback_url(&self, flavor: &str) -> String {
        format!(
            "{}/{}_category_export",
            self.crawl.job_finished_callback_base.trim_end_matches('/'),
            flavor
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/sellerscope".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            queue: QueueConfig {
                task_queue_url: None,
                batch_size: default_queue_batch_size(),
                poll_timeout_secs: default_queue_poll_timeout(),
                visibility_timeout_secs: default_visibility_timeout(),
            },
            crawl: CrawlConfig {
                api_url: default_crawl_api_url(),
                api_key: None,
                project_id: default_crawl_project_id(),
                wb_spider: default_wb_spider(),
                ozon_spider: default_ozon_spider(),
                wb_spider_id: default_wb_spider_id(),
                ozon_spider_id: default_ozon_spider_id(),
                category_list_spider: default_category_list_spider(),
                scheduled_jobs_threshold: default_scheduled_jobs_threshold(),
                job_finished_callback_base: "http://localhost:8080/callback".to_string(),
                timeout_secs: default_crawl_timeout(),
            },
            telegram: TelegramConfig {
                token: String::new(),
                api_base: default_telegram_api_base(),
            },
            tracking: TrackingConfig {
                amplitude_api_key: None,
                amplitude_endpoint: default_amplitude_endpoint(),
            },
            quota: QuotaConfig {
                default_daily_limit: default_daily_limit(),
                window_hours: default_window_hours(),
                recheck_buffer_secs: default_recheck_buffer(),
                stats_retry_delay_secs: default_stats_retry_delay(),
                stats_max_attempts: default_stats_max_attempts(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_rate_limit_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.quota.default_daily_limit, 5);
        assert_eq!(config.crawl.scheduled_jobs_threshold, 1);
    }

    #[test]
    fn test_callback_url_per_flavor() {
        let mut config = AppConfig::default();
        config.crawl.job_finished_callback_base = "https://bot.example.com/callback/".to_string();

        assert_eq!(
            config.callback_url("wb"),
            "https://bot.example.com/callback/wb_category_export"
        );
    }

    #[test]
    fn test_recheck_delay_includes_buffer() {
        let config = AppConfig::default();
        let expected = chrono::Duration::hours(24) + chrono::Duration::seconds(60);
        assert_eq!(config.recheck_delay(), expected);
    }
}
