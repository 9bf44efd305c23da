//! Background task handlers
//!
//! One module per task family; `dispatch` routes a received task message
//! to its handler. Handlers run with at-least-once semantics and must
//! tolerate duplicate execution: resubmitting a crawl job or re-sending a
//! notification is wasteful but not incorrect.

pub mod export;
pub mod quota;
pub mod stats;
pub mod updates;

use sellerscope_common::config::AppConfig;
use sellerscope_common::crawl::CrawlQueue;
use sellerscope_common::db::CatalogStore;
use sellerscope_common::errors::Result;
use sellerscope_common::notify::Notifier;
use sellerscope_common::queue::{TaskMessage, TaskSender};
use sellerscope_common::quota::AdmissionController;
use sellerscope_common::track::Tracker;
use std::sync::Arc;

/// Collaborators shared by every task handler.
///
/// Everything is an injected client object; no module-level singletons.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CatalogStore>,
    pub crawl: Arc<dyn CrawlQueue>,
    pub notifier: Arc<dyn Notifier>,
    pub tracker: Arc<dyn Tracker>,
    pub sender: Arc<dyn TaskSender>,
}

impl TaskContext {
    /// Admission controller over this context's store and quota window
    pub fn admission(&self) -> AdmissionController {
        AdmissionController::new(self.store.clone(), self.config.quota_window())
    }
}

/// Route a task message to its handler
pub async fn dispatch(ctx: &TaskContext, message: TaskMessage) -> Result<()> {
    match message {
        TaskMessage::ScheduleCategoryExport {
            category_url,
            chat_id,
            log_id,
        } => export::schedule_category_export(ctx, &category_url, chat_id, log_id).await,
        TaskMessage::CalculateCategoryStats {
            job_key,
            chat_id,
            attempt,
        } => stats::calculate_category_stats(ctx, &job_key, chat_id, attempt).await,
        TaskMessage::SendRequestsCountMessage { chat_id } => {
            quota::send_requests_count_message(ctx, chat_id).await
        }
        TaskMessage::CheckRequestsRecovered {
            chat_id,
            not_before,
        } => quota::check_requests_recovered(ctx, chat_id, not_before).await,
        TaskMessage::CompareCategorySnapshots => updates::compare_category_snapshots(ctx).await,
    }
}

#[cfg(test)]
pub(crate) mod support {
    use super::TaskContext;
    use sellerscope_common::config::AppConfig;
    use sellerscope_common::crawl::fake::FakeCrawlQueue;
    use sellerscope_common::db::memory::MemoryStore;
    use sellerscope_common::notify::recording::RecordingNotifier;
    use sellerscope_common::queue::recording::RecordingTaskSender;
    use sellerscope_common::track::recording::RecordingTracker;
    use std::sync::Arc;

    /// A task context wired to fakes, plus handles to inspect them
    pub struct TestHarness {
        pub ctx: TaskContext,
        pub store: Arc<MemoryStore>,
        pub crawl: Arc<FakeCrawlQueue>,
        pub notifier: Arc<RecordingNotifier>,
        pub tracker: Arc<RecordingTracker>,
        pub sender: Arc<RecordingTaskSender>,
    }

    pub fn harness() -> TestHarness {
        let config = Arc::new(AppConfig::default());
        let store = Arc::new(MemoryStore::new(config.quota.default_daily_limit));
        let crawl = Arc::new(FakeCrawlQueue::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let tracker = Arc::new(RecordingTracker::new());
        let sender = Arc::new(RecordingTaskSender::new());

        let ctx = TaskContext {
            config,
            store: store.clone(),
            crawl: crawl.clone(),
            notifier: notifier.clone(),
            tracker: tracker.clone(),
            sender: sender.clone(),
        };

        TestHarness {
            ctx,
            store,
            crawl,
            notifier,
            tracker,
            sender,
        }
    }
}
