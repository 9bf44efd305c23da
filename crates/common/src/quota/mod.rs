//! Request admission control
//!
//! Decides whether a user's catalog-analysis request may proceed. The
//! quota is a sliding lookback window over the request log, not a
//! calendar-day reset, so capacity recovers continuously as old requests
//! age out. Only `success`-status entries consume quota: refused or
//! failed submissions never cost the user a slot.
//!
//! This component only reads the log; it has no side effects.

use crate::commands::CommandKind;
use crate::db::models::{RequestStatus, User};
use crate::db::CatalogStore;
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Per-user admission decisions over the sliding quota window
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn CatalogStore>,
    window: Duration,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn CatalogStore>, window: Duration) -> Self {
        Self { store, window }
    }

    /// Successful catalog requests inside the current window
    pub async fn used_in_window(&self, user: &User) -> Result<u64> {
        let since = Utc::now() - self.window;
        self.store
            .count_log(
                user.chat_id,
                CommandKind::CatalogRequest,
                RequestStatus::Success,
                since,
            )
            .await
    }

    /// Slots left before the limit; negative when the limit was lowered
    /// after requests were already logged. Display call-sites clamp.
    pub async fn remaining(&self, user: &User) -> Result<i64> {
        let used = self.used_in_window(user).await?;
        Ok(i64::from(user.daily_catalog_requests_limit) - used as i64)
    }

    /// Whether a new catalog request may proceed
    pub async fn can_admit(&self, user: &User) -> Result<bool> {
        if user.catalog_requests_blocked {
            return Ok(false);
        }

        let used = self.used_in_window(user).await?;
        Ok((used as i64) < i64::from(user.daily_catalog_requests_limit))
    }

    /// When the next slot frees up.
    ///
    /// Under quota this is "now". Over quota it is the moment the oldest
    /// entry of the window-defining set (ascending by creation time,
    /// limited to the daily limit) ages out of the window.
    pub async fn next_free_at(&self, user: &User) -> Result<DateTime<Utc>> {
        let now = Utc::now();

        if self.remaining(user).await? > 0 {
            return Ok(now);
        }

        let since = now - self.window;
        let oldest = self
            .store
            .oldest_log(
                user.chat_id,
                CommandKind::CatalogRequest,
                RequestStatus::Success,
                since,
                user.daily_catalog_requests_limit.max(0) as u64,
            )
            .await?;

        Ok(oldest
            .map(|entry| DateTime::<Utc>::from(entry.created_at) + self.window)
            .unwrap_or(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    const WINDOW_HOURS: i64 = 24;

    fn controller(store: Arc<MemoryStore>) -> AdmissionController {
        AdmissionController::new(store, Duration::hours(WINDOW_HOURS))
    }

    fn success_at(store: &MemoryStore, chat_id: i64, ago: Duration) {
        store.append_log_at(
            chat_id,
            CommandKind::CatalogRequest,
            Some(RequestStatus::Success),
            Utc::now() - ago,
        );
    }

    #[tokio::test]
    async fn test_fresh_user_has_full_availability() {
        let store = Arc::new(MemoryStore::new(5));
        let user = store.seed_user(383716);
        let admission = controller(store);

        assert!(admission.can_admit(&user).await.unwrap());
        assert_eq!(admission.remaining(&user).await.unwrap(), 5);
        assert!(admission.next_free_at(&user).await.unwrap() <= Utc::now());
    }

    #[tokio::test]
    async fn test_blocked_user_is_always_refused() {
        let store = Arc::new(MemoryStore::new(5));
        let mut user = store.seed_user(383716);
        user.catalog_requests_blocked = true;
        store.put_user(user.clone());

        assert!(!controller(store).can_admit(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_limit_reached_refuses_the_next_request() {
        let store = Arc::new(MemoryStore::new(5));
        let user = store.seed_user(383716);
        for i in 0i64..4 {
            success_at(&store, 383716, Duration::minutes(10 + i));
        }
        let admission = controller(store.clone());
        assert!(admission.can_admit(&user).await.unwrap());

        success_at(&store, 383716, Duration::minutes(5));
        assert!(!admission.can_admit(&user).await.unwrap());
        assert_eq!(admission.remaining(&user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_is_sliding_not_calendar() {
        let store = Arc::new(MemoryStore::new(3));
        let user = store.seed_user(383716);
        // Three requests just inside the lookback still count...
        for _ in 0..3 {
            success_at(&store, 383716, Duration::hours(WINDOW_HOURS) - Duration::seconds(30));
        }
        let admission = controller(store.clone());
        assert!(!admission.can_admit(&user).await.unwrap());

        // ...while requests older than the window never do.
        let store = Arc::new(MemoryStore::new(3));
        let user = store.seed_user(383716);
        for _ in 0..3 {
            success_at(&store, 383716, Duration::hours(WINDOW_HOURS) + Duration::seconds(30));
        }
        assert!(controller(store).can_admit(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_success_entries_consume_quota() {
        let store = Arc::new(MemoryStore::new(2));
        let user = store.seed_user(383716);
        store.append_log_at(
            383716,
            CommandKind::CatalogRequest,
            None,
            Utc::now() - Duration::minutes(5),
        );
        store.append_log_at(
            383716,
            CommandKind::CatalogRequest,
            Some(RequestStatus::TooLongQueue),
            Utc::now() - Duration::minutes(4),
        );
        success_at(&store, 383716, Duration::minutes(3));

        let admission = controller(store);
        assert_eq!(admission.used_in_window(&user).await.unwrap(), 1);
        assert!(admission.can_admit(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_commands_do_not_count() {
        let store = Arc::new(MemoryStore::new(1));
        let user = store.seed_user(383716);
        store.append_log_at(
            383716,
            CommandKind::Start,
            Some(RequestStatus::Success),
            Utc::now() - Duration::minutes(5),
        );

        assert!(controller(store).can_admit(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_next_free_at_is_oldest_counted_plus_window() {
        let store = Arc::new(MemoryStore::new(3));
        let user = store.seed_user(383716);
        let oldest = Utc::now() - Duration::hours(23);
        store.append_log_at(
            383716,
            CommandKind::CatalogRequest,
            Some(RequestStatus::Success),
            oldest,
        );
        success_at(&store, 383716, Duration::hours(2));
        success_at(&store, 383716, Duration::hours(1));

        let next = controller(store).next_free_at(&user).await.unwrap();
        assert_eq!(next, oldest + Duration::hours(WINDOW_HOURS));
        assert!(next > Utc::now());
    }

    #[tokio::test]
    async fn test_remaining_goes_negative_after_limit_lowered() {
        let store = Arc::new(MemoryStore::new(5));
        let mut user = store.seed_user(383716);
        for i in 0i64..3 {
            success_at(&store, 383716, Duration::minutes(i));
        }
        user.daily_catalog_requests_limit = 2;
        store.put_user(user.clone());

        assert_eq!(controller(store).remaining(&user).await.unwrap(), -1);
    }
}
