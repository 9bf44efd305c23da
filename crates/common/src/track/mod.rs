//! Analytics event tracking
//!
//! Fire-and-forget: a tracking failure is logged and dropped, never
//! propagated into the chat flow.

use crate::commands::TrackedEvent;
use crate::db::models::User;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Sink for product analytics events
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Record an event for a user; must never fail the caller
    async fn track(&self, user: &User, event: TrackedEvent);
}

/// Amplitude HTTP API tracker
pub struct AmplitudeTracker {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct AmplitudeRequest {
    api_key: String,
    events: Vec<AmplitudeEvent>,
}

#[derive(Serialize)]
struct AmplitudeEvent {
    user_id: i64,
    event_type: String,
    platform: &'static str,
    user_properties: serde_json::Value,
}

impl AmplitudeTracker {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Tracker for AmplitudeTracker {
    async fn track(&self, user: &User, event: TrackedEvent) {
        let body = AmplitudeRequest {
            api_key: self.api_key.clone(),
            events: vec![AmplitudeEvent {
                user_id: user.chat_id,
                event_type: event.description(),
                platform: "Telegram",
                user_properties: json!({
                    "Telegram chat ID": user.chat_id,
                    "Name": user.full_name,
                    "Telegram user name": user.user_name,
                    "Daily catalog request limit": user.daily_catalog_requests_limit,
                    "Subscribed to category updates": user.subscribed_to_category_updates,
                }),
            }],
        };

        let result = self.client.post(&self.endpoint).json(&body).send().await;
        if let Err(e) = result {
            warn!(error = %e, chat_id = user.chat_id, "Failed to deliver tracking event");
        }
    }
}

/// Disabled tracker used when no API key is configured
#[derive(Default)]
pub struct NoopTracker;

#[async_trait]
impl Tracker for NoopTracker {
    async fn track(&self, _user: &User, _event: TrackedEvent) {}
}

/// Recording tracker for tests
#[cfg(any(test, feature = "test-support"))]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingTracker {
        events: Mutex<Vec<(i64, TrackedEvent)>>,
    }

    impl RecordingTracker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<(i64, TrackedEvent)> {
            self.events.lock().expect("tracker poisoned").clone()
        }
    }

    #[async_trait]
    impl Tracker for RecordingTracker {
        async fn track(&self, user: &User, event: TrackedEvent) {
            self.events
                .lock()
                .expect("tracker poisoned")
                .push((user.chat_id, event));
        }
    }
}
