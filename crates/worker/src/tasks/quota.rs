//! Quota messages: remaining-count follow-up and recovery announcement
//!
//! The recovery recheck is scheduled roughly a window after a successful
//! submission. It carries its due time in the payload because the queue
//! caps per-message delay; until the due time passes the handler simply
//! re-delays itself. A recheck that became moot (the user was unblocked,
//! or used more requests meanwhile) runs and finds nothing to announce.

use super::TaskContext;
use chrono::{DateTime, Utc};
use sellerscope_common::commands::TrackedEvent;
use sellerscope_common::errors::Result;
use sellerscope_common::queue::{TaskMessage, MAX_DELAY_SECS};
use sellerscope_common::{messages, metrics};
use tracing::{debug, info, warn};

/// Tell the user how many catalog requests they have left
pub async fn send_requests_count_message(ctx: &TaskContext, chat_id: i64) -> Result<()> {
    let user = match ctx.store.find_user(chat_id).await? {
        Some(user) => user,
        None => {
            warn!(chat_id, "Requests-count message for unknown user");
            return Ok(());
        }
    };

    let admission = ctx.admission();
    let requests_left = admission.remaining(&user).await?;
    let requests_today = admission.used_in_window(&user).await? as i64;

    let text = messages::requests_count(
        requests_left,
        requests_today,
        user.daily_catalog_requests_limit,
    );
    ctx.notifier.send_text(chat_id, &text).await?;
    metrics::record_notification("requests_count");

    Ok(())
}

/// Announce a fully recovered quota window, or do nothing
pub async fn check_requests_recovered(
    ctx: &TaskContext,
    chat_id: i64,
    not_before: DateTime<Utc>,
) -> Result<()> {
    let now = Utc::now();
    if now < not_before {
        // Delivered early because of the per-message delay cap; re-delay.
        let remaining = (not_before - now).num_seconds().max(1);
        debug!(chat_id, remaining, "Recovery recheck not due yet, re-delaying");
        return ctx
            .sender
            .enqueue_delayed(
                TaskMessage::CheckRequestsRecovered {
                    chat_id,
                    not_before,
                },
                remaining.min(MAX_DELAY_SECS),
            )
            .await;
    }

    let user = match ctx.store.find_user(chat_id).await? {
        Some(user) => user,
        None => {
            warn!(chat_id, "Recovery recheck for unknown user");
            return Ok(());
        }
    };

    let remaining = ctx.admission().remaining(&user).await?;
    if remaining == i64::from(user.daily_catalog_requests_limit) {
        info!(chat_id, "Quota fully recovered, announcing");
        ctx.notifier
            .send_text(
                chat_id,
                &messages::requests_recovered(user.daily_catalog_requests_limit),
            )
            .await?;
        metrics::record_notification("requests_recovered");
        ctx.tracker.track(&user, TrackedEvent::RequestsRecovered).await;
    } else {
        debug!(chat_id, remaining, "Quota not fully recovered, no notification needed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::support::harness;
    use chrono::Duration;
    use sellerscope_common::commands::CommandKind;
    use sellerscope_common::db::models::RequestStatus;

    const CHAT_ID: i64 = 383716;

    fn log_success(h: &crate::tasks::support::TestHarness, ago: Duration) {
        h.store.append_log_at(
            CHAT_ID,
            CommandKind::CatalogRequest,
            Some(RequestStatus::Success),
            Utc::now() - ago,
        );
    }

    #[tokio::test]
    async fn test_count_message_shows_remaining_and_used() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        log_success(&h, Duration::hours(1));
        log_success(&h, Duration::hours(2));

        send_requests_count_message(&h.ctx, CHAT_ID).await.unwrap();

        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Вам доступно 3 из 5 запросов"));
        assert!(texts[0].contains("🌕🌕🌕🌑🌑"));
    }

    #[tokio::test]
    async fn test_count_message_when_exhausted() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        for i in 0i64..5 {
            log_success(&h, Duration::minutes(i));
        }

        send_requests_count_message(&h.ctx, CHAT_ID).await.unwrap();

        assert!(h.notifier.texts()[0].contains("У вас больше нет доступных запросов."));
    }

    #[tokio::test]
    async fn test_unknown_user_is_skipped() {
        let h = harness();
        send_requests_count_message(&h.ctx, CHAT_ID).await.unwrap();
        assert!(h.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn test_recheck_re_delays_until_due() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        let not_before = Utc::now() + Duration::hours(20);

        check_requests_recovered(&h.ctx, CHAT_ID, not_before)
            .await
            .unwrap();

        // Nothing sent; the task re-enqueued itself at the delay cap
        assert!(h.notifier.texts().is_empty());
        let enqueued = h.sender.enqueued();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].1, Some(MAX_DELAY_SECS));
        assert!(matches!(
            enqueued[0].0,
            TaskMessage::CheckRequestsRecovered { chat_id: CHAT_ID, .. }
        ));
    }

    #[tokio::test]
    async fn test_recovered_quota_is_announced() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        // Old request outside the window: quota fully recovered
        log_success(&h, Duration::hours(25));

        check_requests_recovered(&h.ctx, CHAT_ID, Utc::now() - Duration::seconds(5))
            .await
            .unwrap();

        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Рок-н-ролл"));
        assert_eq!(
            h.tracker.events(),
            vec![(CHAT_ID, TrackedEvent::RequestsRecovered)]
        );
    }

    #[tokio::test]
    async fn test_partial_recovery_stays_silent() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        log_success(&h, Duration::hours(2));

        check_requests_recovered(&h.ctx, CHAT_ID, Utc::now() - Duration::seconds(5))
            .await
            .unwrap();

        assert!(h.notifier.texts().is_empty());
        assert!(h.tracker.events().is_empty());
        assert!(h.sender.enqueued().is_empty());
    }
}
