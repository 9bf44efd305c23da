//! In-memory `CatalogStore` for tests
//!
//! Mirrors the repository semantics closely enough for the admission and
//! scheduling tests: upsert-by-chat-id, append-only log, range-filtered
//! counting. Extra helpers allow seeding users and backdated log entries.

use crate::commands::CommandKind;
use crate::db::models::{RequestLogEntry, RequestStatus, User};
use crate::db::{CatalogStore, ChatIdentity};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<i64, User>,
    log: Vec<RequestLogEntry>,
}

/// In-memory store fake
pub struct MemoryStore {
    state: Mutex<State>,
    default_daily_limit: i32,
}

impl MemoryStore {
    pub fn new(default_daily_limit: i32) -> Self {
        Self {
            state: Mutex::new(State::default()),
            default_daily_limit,
        }
    }

    /// Insert or replace a user row directly
    pub fn put_user(&self, user: User) {
        self.state
            .lock()
            .expect("store poisoned")
            .users
            .insert(user.chat_id, user);
    }

    /// Seed a user with defaults and return it
    pub fn seed_user(&self, chat_id: i64) -> User {
        let now = Utc::now();
        let user = User {
            chat_id,
            user_name: Some("hemantic".to_string()),
            full_name: "Артём Киселёв".to_string(),
            daily_catalog_requests_limit: self.default_daily_limit,
            catalog_requests_blocked: false,
            subscribed_to_category_updates: false,
            created_at: now.into(),
            updated_at: now.into(),
        };
        self.put_user(user.clone());
        user
    }

    /// Append a log entry with an explicit status and creation time
    pub fn append_log_at(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: Option<RequestStatus>,
        created_at: DateTime<Utc>,
    ) -> RequestLogEntry {
        let entry = RequestLogEntry {
            id: Uuid::new_v4(),
            chat_id,
            command: command.slug().to_string(),
            payload: String::new(),
            status: status.map(|s| s.as_str().to_string()),
            created_at: created_at.into(),
        };
        self.state
            .lock()
            .expect("store poisoned")
            .log
            .push(entry.clone());
        entry
    }

    /// Snapshot of all log entries, in append order
    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.state.lock().expect("store poisoned").log.clone()
    }

    /// Fetch a single entry by id
    pub fn entry(&self, log_id: Uuid) -> Option<RequestLogEntry> {
        self.state
            .lock()
            .expect("store poisoned")
            .log
            .iter()
            .find(|e| e.id == log_id)
            .cloned()
    }

    fn matching(
        state: &State,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
    ) -> Vec<RequestLogEntry> {
        let mut entries: Vec<RequestLogEntry> = state
            .log
            .iter()
            .filter(|e| {
                e.chat_id == chat_id
                    && e.command == command.slug()
                    && e.status.as_deref() == Some(status.as_str())
                    && DateTime::<Utc>::from(e.created_at) >= since
            })
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_or_create_user(&self, identity: &ChatIdentity) -> Result<User> {
        let mut state = self.state.lock().expect("store poisoned");
        let now = Utc::now();

        if let Some(existing) = state.users.get_mut(&identity.chat_id) {
            if existing.user_name != identity.user_name || existing.full_name != identity.full_name
            {
                existing.user_name = identity.user_name.clone();
                existing.full_name = identity.full_name.clone();
                existing.updated_at = now.into();
            }
            return Ok(existing.clone());
        }

        let user = User {
            chat_id: identity.chat_id,
            user_name: identity.user_name.clone(),
            full_name: identity.full_name.clone(),
            daily_catalog_requests_limit: self.default_daily_limit,
            catalog_requests_blocked: false,
            subscribed_to_category_updates: false,
            created_at: now.into(),
            updated_at: now.into(),
        };
        state.users.insert(user.chat_id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, chat_id: i64) -> Result<Option<User>> {
        Ok(self
            .state
            .lock()
            .expect("store poisoned")
            .users
            .get(&chat_id)
            .cloned())
    }

    async fn append_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        payload: &str,
    ) -> Result<RequestLogEntry> {
        let entry = RequestLogEntry {
            id: Uuid::new_v4(),
            chat_id,
            command: command.slug().to_string(),
            payload: payload.to_string(),
            status: None,
            created_at: Utc::now().into(),
        };
        self.state
            .lock()
            .expect("store poisoned")
            .log
            .push(entry.clone());
        Ok(entry)
    }

    async fn set_log_status(
        &self,
        log_id: Uuid,
        status: RequestStatus,
    ) -> Result<RequestLogEntry> {
        let mut state = self.state.lock().expect("store poisoned");
        let entry = state
            .log
            .iter_mut()
            .find(|e| e.id == log_id)
            .ok_or_else(|| AppError::LogEntryNotFound {
                id: log_id.to_string(),
            })?;
        entry.status = Some(status.as_str().to_string());
        Ok(entry.clone())
    }

    async fn count_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let state = self.state.lock().expect("store poisoned");
        Ok(Self::matching(&state, chat_id, command, status, since).len() as u64)
    }

    async fn oldest_log(
        &self,
        chat_id: i64,
        command: CommandKind,
        status: RequestStatus,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Option<RequestLogEntry>> {
        let state = self.state.lock().expect("store poisoned");
        Ok(Self::matching(&state, chat_id, command, status, since)
            .into_iter()
            .take(limit as usize)
            .next())
    }

    async fn list_subscribed_users(&self) -> Result<Vec<User>> {
        let state = self.state.lock().expect("store poisoned");
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.subscribed_to_category_updates)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.chat_id);
        Ok(users)
    }
}
