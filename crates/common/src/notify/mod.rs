//! Outbound notification channel
//!
//! The core only pushes messages and files to a chat identity; delivery
//! reliability beyond the immediate request is the messenger's problem.
//! The client object is constructed once at process start and injected
//! into every component that needs it.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Outbound text/file delivery to a chat
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a text message
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send a file as a document with a caption
    async fn send_file(
        &self,
        chat_id: i64,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<()>;
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build Telegram HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        self.client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Notify {
                message: format!("sendMessage failed: {}", e),
            })?;

        debug!(chat_id, "Sent text message");
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: i64,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        self.client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Notify {
                message: format!("sendDocument failed: {}", e),
            })?;

        debug!(chat_id, filename, "Sent document");
        Ok(())
    }
}

/// Recording notifier for tests: captures everything, delivers nothing.
#[cfg(any(test, feature = "test-support"))]
pub mod recording {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// One captured outbound message
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text { chat_id: i64, text: String },
        File {
            chat_id: i64,
            path: PathBuf,
            filename: String,
        },
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Sent>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().expect("notifier poisoned").clone()
        }

        /// Texts only, in send order
        pub fn texts(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Text { text, .. } => Some(text),
                    Sent::File { .. } => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().expect("notifier poisoned").push(Sent::Text {
                chat_id,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_file(
            &self,
            chat_id: i64,
            path: &Path,
            filename: &str,
            _caption: &str,
        ) -> Result<()> {
            self.sent.lock().expect("notifier poisoned").push(Sent::File {
                chat_id,
                path: path.to_path_buf(),
                filename: filename.to_string(),
            });
            Ok(())
        }
    }
}
