//! SellerScope Common Library
//!
//! Shared code for the SellerScope services including:
//! - Database models and repository pattern (users, request log)
//! - Request admission (per-user quota windows)
//! - Category snapshot differencing and export
//! - Crawl queue client abstraction
//! - Telegram notifier and analytics tracker
//! - Task queue wrapper (SQS)
//! - Error types, configuration, metrics

pub mod catalog;
pub mod commands;
pub mod config;
pub mod crawl;
pub mod db;
pub mod errors;
pub mod format;
pub mod messages;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod quota;
pub mod stats;
pub mod track;

// Re-export commonly used types
pub use commands::{CommandKind, TrackedEvent};
pub use config::AppConfig;
pub use db::{CatalogStore, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command slug whose successful requests are counted against the daily quota
pub const CATALOG_COMMAND: commands::CommandKind = commands::CommandKind::CatalogRequest;
