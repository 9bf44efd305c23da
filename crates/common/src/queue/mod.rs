//! SQS task queue integration
//!
//! Provides:
//! - SQS client wrapper for the background task queue
//! - Typed, serde-tagged task messages
//! - Deferred delivery with the SQS per-message delay cap handled by
//!   carrying a `not_before` timestamp inside the payload
//!
//! Execution is at-least-once: a crash between side effects and message
//! deletion re-runs the handler, so every task must tolerate duplicates.

use crate::config::QueueConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// SQS caps per-message delivery delay at 15 minutes
pub const MAX_DELAY_SECS: i64 = 900;

/// Background tasks processed by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskMessage {
    /// Submit a category-export crawl for an admitted request
    ScheduleCategoryExport {
        category_url: String,
        chat_id: i64,
        log_id: Uuid,
    },
    /// Compute and deliver category statistics for a finished crawl
    CalculateCategoryStats {
        job_key: String,
        chat_id: i64,
        #[serde(default)]
        attempt: u32,
    },
    /// Tell the user how many requests they have left
    SendRequestsCountMessage { chat_id: i64 },
    /// Deferred quota-recovery check; runs once `not_before` has passed
    CheckRequestsRecovered {
        chat_id: i64,
        not_before: DateTime<Utc>,
    },
    /// Diff the two latest category-listing snapshots and broadcast
    CompareCategorySnapshots,
}

/// A received task together with its SQS receipt handle
#[derive(Debug, Clone)]
pub struct ReceivedTask {
    pub message: TaskMessage,
    pub receipt_handle: String,
}

/// Enqueue side of the task queue, injectable into task handlers
#[async_trait]
pub trait TaskSender: Send + Sync {
    /// Enqueue for immediate delivery
    async fn enqueue(&self, message: TaskMessage) -> Result<()>;

    /// Enqueue with a delivery delay; clamped to the SQS maximum
    async fn enqueue_delayed(&self, message: TaskMessage, delay_secs: i64) -> Result<()>;
}

/// SQS task queue client wrapper
pub struct TaskQueue {
    client: SqsClient,
    url: String,
    config: QueueConfig,
}

impl TaskQueue {
    /// Create a new queue client from the ambient AWS configuration
    pub async fn new(config: QueueConfig) -> Result<Self> {
        let url = config
            .task_queue_url
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "queue.task_queue_url is not set".to_string(),
            })?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = SqsClient::new(&aws_config);

        Ok(Self {
            client,
            url,
            config,
        })
    }

    /// Create with an existing SQS client
    pub fn with_client(client: SqsClient, url: String, config: QueueConfig) -> Self {
        Self {
            client,
            url,
            config,
        }
    }

    async fn send_with_delay(&self, message: &TaskMessage, delay_secs: Option<i32>) -> Result<()> {
        let body = serde_json::to_string(message)?;

        let mut request = self
            .client
            .send_message()
            .queue_url(&self.url)
            .message_body(&body);
        if let Some(delay) = delay_secs {
            request = request.delay_seconds(delay);
        }

        request.send().await.map_err(|e| AppError::Queue {
            message: format!("Failed to send task: {}", e),
        })?;

        debug!(task = ?message, delay_secs, "Task enqueued");
        Ok(())
    }

    /// Receive and parse the next batch of tasks.
    ///
    /// Malformed payloads are logged and dropped so one poison message
    /// cannot wedge the queue.
    pub async fn receive(&self) -> Result<Vec<ReceivedTask>> {
        let result = self
            .client
            .receive_message()
            .queue_url(&self.url)
            .max_number_of_messages(self.config.batch_size)
            .visibility_timeout(self.config.visibility_timeout_secs)
            .wait_time_seconds(self.config.poll_timeout_secs)
            .send()
            .await
            .map_err(|e| AppError::Queue {
                message: format!("Failed to receive tasks: {}", e),
            })?;

        let mut tasks = Vec::new();
        for message in result.messages.unwrap_or_default() {
            let receipt_handle = match message.receipt_handle {
                Some(handle) => handle,
                None => continue,
            };
            let body = message.body.unwrap_or_default();

            match serde_json::from_str::<TaskMessage>(&body) {
                Ok(parsed) => tasks.push(ReceivedTask {
                    message: parsed,
                    receipt_handle,
                }),
                Err(e) => {
                    warn!(error = %e, body = %body, "Dropping malformed task message");
                    self.delete(&receipt_handle).await?;
                }
            }
        }

        Ok(tasks)
    }

    /// Delete a task after processing
    pub async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AppError::Queue {
                message: format!("Failed to delete task: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl TaskSender for TaskQueue {
    async fn enqueue(&self, message: TaskMessage) -> Result<()> {
        self.send_with_delay(&message, None).await
    }

    async fn enqueue_delayed(&self, message: TaskMessage, delay_secs: i64) -> Result<()> {
        let clamped = delay_secs.clamp(0, MAX_DELAY_SECS) as i32;
        self.send_with_delay(&message, Some(clamped)).await
    }
}

/// Recording sender for tests
#[cfg(any(test, feature = "test-support"))]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingTaskSender {
        enqueued: Mutex<Vec<(TaskMessage, Option<i64>)>>,
    }

    impl RecordingTaskSender {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every enqueued task with its requested delay
        pub fn enqueued(&self) -> Vec<(TaskMessage, Option<i64>)> {
            self.enqueued.lock().expect("sender poisoned").clone()
        }
    }

    #[async_trait]
    impl TaskSender for RecordingTaskSender {
        async fn enqueue(&self, message: TaskMessage) -> Result<()> {
            self.enqueued
                .lock()
                .expect("sender poisoned")
                .push((message, None));
            Ok(())
        }

        async fn enqueue_delayed(&self, message: TaskMessage, delay_secs: i64) -> Result<()> {
            self.enqueued
                .lock()
                .expect("sender poisoned")
                .push((message, Some(delay_secs)));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_message_round_trip() {
        let task = TaskMessage::ScheduleCategoryExport {
            category_url: "https://www.wildberries.ru/catalog/knigi-i-diski".to_string(),
            chat_id: 383716,
            log_id: Uuid::new_v4(),
        };

        let json = serde_json::to_string(&task).unwrap();
        let parsed: TaskMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(task, parsed);
    }

    #[test]
    fn test_task_tag_is_snake_case() {
        let json = serde_json::to_string(&TaskMessage::CompareCategorySnapshots).unwrap();
        assert!(json.contains("\"task\":\"compare_category_snapshots\""));
    }

    #[test]
    fn test_stats_attempt_defaults_to_zero() {
        let json = r#"{"task":"calculate_category_stats","job_key":"414324/1/356","chat_id":383716}"#;
        let parsed: TaskMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            TaskMessage::CalculateCategoryStats {
                job_key: "414324/1/356".to_string(),
                chat_id: 383716,
                attempt: 0,
            }
        );
    }
}
