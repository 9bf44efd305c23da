//! Category statistics computation and delivery
//!
//! Runs when the crawl backend calls back with a finished job. The
//! "not finished yet" condition is transient: the task re-enqueues itself
//! with a fixed delay and an attempt counter, and only after the retry
//! budget is exhausted does the user see the permanent failure message.

use super::TaskContext;
use sellerscope_common::catalog::export::export_items;
use sellerscope_common::commands::TrackedEvent;
use sellerscope_common::crawl::CrawlFlavor;
use sellerscope_common::errors::{AppError, Result};
use sellerscope_common::queue::TaskMessage;
use sellerscope_common::stats::CategoryStats;
use sellerscope_common::{messages, metrics};
use tracing::{error, info, warn};

/// Compute stats for a finished crawl and deliver summary plus report
pub async fn calculate_category_stats(
    ctx: &TaskContext,
    job_key: &str,
    chat_id: i64,
    attempt: u32,
) -> Result<()> {
    let flavor = CrawlFlavor::detect(job_key, &ctx.config.crawl).unwrap_or_else(|| {
        warn!(job_key, "Unknown spider in job key, assuming WB");
        CrawlFlavor::Wb
    });

    let items = match ctx.crawl.fetch_finished_items(job_key).await {
        Ok(items) => items,
        Err(AppError::CrawlNotReady { .. }) => {
            return defer_or_give_up(ctx, job_key, chat_id, attempt).await;
        }
        // Transport failures propagate; queue redelivery retries them.
        Err(other) => return Err(other),
    };

    let stats = match CategoryStats::from_items(items) {
        Ok(stats) => stats,
        Err(AppError::EmptyDataset) => {
            error!(job_key, chat_id, "Crawl returned an empty category");
            ctx.notifier
                .send_text(chat_id, messages::EMPTY_CATEGORY)
                .await?;
            return Ok(());
        }
        Err(other) => return Err(other),
    };

    let summary = messages::category_summary(&stats, flavor.marketplace());
    ctx.notifier.send_text(chat_id, &summary).await?;
    metrics::record_notification("summary");

    let report = export_items(stats.items())?;
    let filename = format!("{} на {}.csv", stats.category_name(), flavor.marketplace());
    if let Err(e) = ctx
        .notifier
        .send_file(chat_id, report.path(), &filename, messages::REPORT_CAPTION)
        .await
    {
        // The summary already went out; a lost attachment is not worth
        // failing the task and re-sending everything.
        error!(chat_id, error = %e, "Error while sending report file");
    } else {
        metrics::record_notification("report");
    }

    ctx.sender
        .enqueue(TaskMessage::SendRequestsCountMessage { chat_id })
        .await?;

    if let Some(user) = ctx.store.find_user(chat_id).await? {
        ctx.tracker
            .track(
                &user,
                TrackedEvent::CategoryAnalysisReceived {
                    marketplace: flavor.slug().to_string(),
                },
            )
            .await;
    }

    metrics::record_report_delivered();
    info!(job_key, chat_id, "Category stats delivered");
    Ok(())
}

/// Bounded retry: fixed delay, capped attempt count
async fn defer_or_give_up(
    ctx: &TaskContext,
    job_key: &str,
    chat_id: i64,
    attempt: u32,
) -> Result<()> {
    let max_attempts = ctx.config.quota.stats_max_attempts;

    if attempt >= max_attempts {
        error!(job_key, chat_id, attempt, "Crawl never finished, giving up");
        ctx.notifier
            .send_text(chat_id, messages::COULD_NOT_PROCESS)
            .await?;
        return Ok(());
    }

    warn!(job_key, chat_id, attempt, "Crawl not finished yet, deferring");
    metrics::record_stats_retry();
    ctx.sender
        .enqueue_delayed(
            TaskMessage::CalculateCategoryStats {
                job_key: job_key.to_string(),
                chat_id,
                attempt: attempt + 1,
            },
            i64::from(ctx.config.quota.stats_retry_delay_secs),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::support::harness;
    use sellerscope_common::crawl::ItemRecord;

    const CHAT_ID: i64 = 383716;
    const JOB_KEY: &str = "414324/1/356";

    fn items() -> Vec<ItemRecord> {
        vec![
            ItemRecord {
                name: "Товар 1".to_string(),
                url: "https://www.wildberries.ru/catalog/1/detail.aspx".to_string(),
                category_name: "Книги и диски".to_string(),
                category_url: "https://www.wildberries.ru/catalog/knigi-i-diski".to_string(),
                price: 760.0,
                purchases: 3250.0,
            },
            ItemRecord {
                name: "Товар 2".to_string(),
                url: "https://www.wildberries.ru/catalog/2/detail.aspx".to_string(),
                category_name: "Книги и диски".to_string(),
                category_url: "https://www.wildberries.ru/catalog/knigi-i-diski".to_string(),
                price: 120.0,
                purchases: 10.0,
            },
        ]
    }

    #[tokio::test]
    async fn test_delivers_summary_report_and_follow_up() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        h.crawl.set_items(JOB_KEY, items());

        calculate_category_stats(&h.ctx, JOB_KEY, CHAT_ID, 0)
            .await
            .unwrap();

        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Книги и диски"));
        assert!(texts[0].contains("Количество товаров: `2`"));

        // Report document went out with the marketplace in the filename
        let sent = h.notifier.sent();
        assert!(sent.iter().any(|s| matches!(
            s,
            sellerscope_common::notify::recording::Sent::File { filename, .. }
                if filename == "Книги и диски на Wildberries.csv"
        )));

        // Requests-count follow-up enqueued, analysis event tracked
        assert!(h
            .sender
            .enqueued()
            .iter()
            .any(|(m, _)| matches!(m, TaskMessage::SendRequestsCountMessage { chat_id: CHAT_ID })));
        assert_eq!(
            h.tracker.events(),
            vec![(
                CHAT_ID,
                TrackedEvent::CategoryAnalysisReceived {
                    marketplace: "WB".to_string()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_not_ready_defers_with_fixed_delay() {
        let h = harness();
        h.crawl.set_not_ready(JOB_KEY);

        calculate_category_stats(&h.ctx, JOB_KEY, CHAT_ID, 0)
            .await
            .unwrap();

        // No user-facing message yet, just a delayed retry
        assert!(h.notifier.texts().is_empty());
        let enqueued = h.sender.enqueued();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(
            enqueued[0],
            (
                TaskMessage::CalculateCategoryStats {
                    job_key: JOB_KEY.to_string(),
                    chat_id: CHAT_ID,
                    attempt: 1,
                },
                Some(10)
            )
        );
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_permanent() {
        let h = harness();
        h.crawl.set_not_ready(JOB_KEY);
        let max = h.ctx.config.quota.stats_max_attempts;

        calculate_category_stats(&h.ctx, JOB_KEY, CHAT_ID, max)
            .await
            .unwrap();

        assert_eq!(h.notifier.texts(), vec![messages::COULD_NOT_PROCESS.to_string()]);
        assert!(h.sender.enqueued().is_empty());
    }

    #[tokio::test]
    async fn test_empty_category_is_reported_without_retry() {
        let h = harness();
        h.crawl.set_items(JOB_KEY, vec![]);

        calculate_category_stats(&h.ctx, JOB_KEY, CHAT_ID, 0)
            .await
            .unwrap();

        assert_eq!(h.notifier.texts(), vec![messages::EMPTY_CATEGORY.to_string()]);
        assert!(h.sender.enqueued().is_empty());
    }

    #[tokio::test]
    async fn test_ozon_job_key_is_detected() {
        let h = harness();
        h.store.seed_user(CHAT_ID);
        h.crawl.set_items("414324/2/77", items());

        calculate_category_stats(&h.ctx, "414324/2/77", CHAT_ID, 0)
            .await
            .unwrap();

        assert!(h.notifier.texts()[0].contains("на Ozon"));
    }
}
