//! Repository pattern for database operations
//!
//! SeaORM-backed implementation of [`CatalogStore`]. All mutation is
//! single-row upsert or single-row append; no multi-row transactions are
//! needed because the quota count is a derived read, not a locked counter.

use crate::commands::CommandKind;
use crate::db::models::*;
use crate::db::{CatalogStore, ChatIdentity, DbPool};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
    default_daily_limit: i32,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool, default_daily_limit: i32) -> Self {
        Self {
            pool,
            default_daily_limit,
        }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl CatalogStore for Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    async fn find_or_create_user(&self, identity: &ChatIdentity) -> Result<User> {
        let now = Utc::now();

        if let Some(existing) = UserEntity::find_by_id(identity.chat_id)
            .one(self.conn())
            .await?
        {
            // Refresh identity fields when Telegram reports a change
            if existing.user_name != identity.user_name || existing.full_name != identity.full_name
            {
                let mut active: UserActiveModel = existing.into();
                active.user_name = Set(identity.user_name.clone());
                active.full_name = Set(identity.full_name.clone());
                active.updated_at = Set(now.into());
                return active.update(self.conn()).await.map_err(Into::into);
            }
            return Ok(existing);
        }

        let user = UserActiveModel {
            chat_id: Set(identity.chat_id),
            user_name: Set(identity.user_name.clone()),
            full_name: Set(identity.full_name.clone()),
            daily_catalog_requests_limit: Set(self.default_daily_limit),
            catalog_requests_blocked: Set(false),
            subscribed_to_category_updates: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.conn()).await.map_err(Into::into)
    }

    async fn find_user(&self, chat_id: i64) -> Result<Option<User>> {
        UserEntity::find_by_id(chat_id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Request Log Operations
    // ========================================================================

    async fn append_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        payload: &str,
    ) -> Result<RequestLogEntry> {
        let entry = RequestLogActiveModel {
            id: Set(Uuid::new_v4()),
            chat_id: Set(chat_id),
            command: Set(command.slug().to_string()),
            payload: Set(payload.to_string()),
            status: Set(None),
            created_at: Set(Utc::now().into()),
        };

        entry.insert(self.conn()).await.map_err(Into::into)
    }

    async fn set_log_status(
        &self,
        log_id: Uuid,
        status: RequestStatus,
    ) -> Result<RequestLogEntry> {
        let entry = RequestLogEntity::find_by_id(log_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::LogEntryNotFound {
                id: log_id.to_string(),
            })?;

        let mut active: RequestLogActiveModel = entry.into();
        active.status = Set(Some(status.as_str().to_string()));
        active.update(self.conn()).await.map_err(Into::into)
    }

    async fn count_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        RequestLogEntity::find()
            .filter(RequestLogColumn::ChatId.eq(chat_id))
            .filter(RequestLogColumn::Command.eq(command.slug()))
            .filter(RequestLogColumn::Status.eq(status.as_str()))
            .filter(RequestLogColumn::CreatedAt.gte(since))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn oldest_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Option<RequestLogEntry>> {
        RequestLogEntity::find()
            .filter(RequestLogColumn::ChatId.eq(chat_id))
            .filter(RequestLogColumn::Command.eq(command.slug()))
            .filter(RequestLogColumn::Status.eq(status.as_str()))
            .filter(RequestLogColumn::CreatedAt.gte(since))
            .order_by_asc(RequestLogColumn::CreatedAt)
            .limit(limit)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Subscription Operations
    // ========================================================================

    async fn list_subscribed_users(&self) -> Result<Vec<User>> {
        UserEntity::find()
            .filter(UserColumn::SubscribedToCategoryUpdates.eq(true))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}
