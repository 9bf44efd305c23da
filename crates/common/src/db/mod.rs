//! Database layer for SellerScope
//!
//! Provides:
//! - SeaORM entity models
//! - The `CatalogStore` trait consumed by the core components
//! - `Repository`, the SeaORM-backed store implementation
//! - Connection pool management

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
mod repository;

pub use repository::Repository;

use crate::commands::CommandKind;
use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models::{RequestLogEntry, RequestStatus, User};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Identity fields extracted from an inbound Telegram message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    pub chat_id: i64,
    pub user_name: Option<String>,
    pub full_name: String,
}

/// Durable store of users and the append-only request log.
///
/// The admission controller and the task handlers depend on this trait
/// rather than on the concrete repository, so tests can substitute an
/// in-memory fake.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch the user for this chat identity, creating it with defaults on
    /// first contact. A changed handle or display name is persisted;
    /// `updated_at` refreshes on every save, `created_at` never changes.
    async fn find_or_create_user(&self, identity: &ChatIdentity) -> Result<User>;

    /// Look up a user by chat id
    async fn find_user(&self, chat_id: i64) -> Result<Option<User>>;

    /// Append a log entry with unset status; `created_at` is immutable
    async fn append_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        payload: &str,
    ) -> Result<RequestLogEntry>;

    /// Set a log entry's status; intended to be called exactly once when
    /// the asynchronous job outcome becomes known
    async fn set_log_status(&self, log_id: Uuid, status: RequestStatus)
        -> Result<RequestLogEntry>;

    /// Count a user's log entries for `command` with `status`, created at
    /// or after `since` (indexed range query)
    async fn count_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
    ) -> Result<u64>;

    /// The oldest of a user's qualifying entries created at or after
    /// `since`, ordered ascending by creation time and limited to `limit`
    /// entries (the window-defining set)
    async fn oldest_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Option<RequestLogEntry>>;

    /// All users subscribed to category-listing updates
    async fn list_subscribed_users(&self) -> Result<Vec<User>>;
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
