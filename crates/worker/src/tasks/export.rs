//! Category export scheduling
//!
//! Submits a crawl job for an admitted request under the global crawl
//! queue cap, and converts every failure into a user-facing message. The
//! check-then-submit is not atomic against the external queue: two near
//! simultaneous admissions can both pass the threshold. That is a soft
//! limit; excess work queues on the crawl backend instead of failing.

use super::TaskContext;
use chrono::Utc;
use sellerscope_common::crawl::{CrawlFlavor, CrawlJobParams, JobState};
use sellerscope_common::db::models::RequestStatus;
use sellerscope_common::errors::{AppError, Result};
use sellerscope_common::queue::TaskMessage;
use sellerscope_common::{commands::TrackedEvent, messages, metrics};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Submit a category-export crawl and notify the user of the outcome.
///
/// Failure rule: every scheduling failure, queue saturation and
/// transport errors alike, terminates the log entry as
/// `too_long_queue`, sends the single apology text and emits the
/// tracking event. Errors are swallowed after conversion so the chat
/// flow never crashes with the user left waiting.
pub async fn schedule_category_export(
    ctx: &TaskContext,
    category_url: &str,
    chat_id: i64,
    log_id: Uuid,
) -> Result<()> {
    match submit(ctx, category_url, chat_id).await {
        Ok(job_key) => {
            info!(chat_id, job_key = %job_key, "Category export scheduled");
            ctx.store
                .set_log_status(log_id, RequestStatus::Success)
                .await?;
            metrics::record_submission(true);

            ctx.notifier.send_text(chat_id, messages::PROCESSING).await?;

            // Fire the quota-recovery check once the oldest slot can have
            // aged out; the handler re-delays itself until `not_before`.
            let delay = ctx.config.recheck_delay();
            ctx.sender
                .enqueue_delayed(
                    TaskMessage::CheckRequestsRecovered {
                        chat_id,
                        not_before: Utc::now() + delay,
                    },
                    delay.num_seconds(),
                )
                .await?;
        }
        Err(err) => {
            match &err {
                AppError::QueueSaturated {
                    pending,
                    running,
                    threshold,
                } => warn!(
                    chat_id,
                    pending, running, threshold, "Crawl queue saturated, submission refused"
                ),
                other => error!(chat_id, error = %other, "Category export submission failed"),
            }

            ctx.store
                .set_log_status(log_id, RequestStatus::TooLongQueue)
                .await?;
            metrics::record_submission(false);

            ctx.notifier
                .send_text(chat_id, messages::TOO_LONG_QUEUE)
                .await?;

            if let Some(user) = ctx.store.find_user(chat_id).await? {
                ctx.tracker
                    .track(&user, TrackedEvent::TooLongQueueError)
                    .await;
            }
        }
    }

    Ok(())
}

/// Check queue pressure, then submit
async fn submit(ctx: &TaskContext, category_url: &str, chat_id: i64) -> Result<String> {
    let flavor = CrawlFlavor::Wb;
    let crawl_config = &ctx.config.crawl;

    let pending = ctx.crawl.count_jobs(flavor, JobState::Pending).await?;
    let running = ctx.crawl.count_jobs(flavor, JobState::Running).await?;
    let threshold = crawl_config.scheduled_jobs_threshold;

    if pending + running > threshold {
        return Err(AppError::QueueSaturated {
            pending,
            running,
            threshold,
        });
    }

    let params = CrawlJobParams::new(
        category_url,
        &ctx.config.callback_url(flavor.spider(crawl_config)),
        chat_id,
    );
    ctx.crawl.submit_job(flavor, &params).await
}
