//! Telegram webhook handler
//!
//! Routes inbound updates by text pattern the way the reply keyboard and
//! inline buttons present them. The admission check runs inline here
//! (a single indexed log count, fast enough for the webhook path);
//! everything heavier is enqueued for the worker.

use crate::AppState;
use axum::{extract::State, Json};
use regex_lite::Regex;
use sellerscope_common::commands::CommandKind;
use sellerscope_common::config::AppConfig;
use sellerscope_common::db::{CatalogStore, ChatIdentity};
use sellerscope_common::errors::Result;
use sellerscope_common::notify::Notifier;
use sellerscope_common::queue::{TaskMessage, TaskSender};
use sellerscope_common::quota::AdmissionController;
use sellerscope_common::{messages, metrics};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Inbound Telegram update (only the fields the bot reads)
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub data: Option<String>,
    pub message: Option<IncomingMessage>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: String,
}

/// Collaborators needed to process one update
#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CatalogStore>,
    pub notifier: Arc<dyn Notifier>,
    pub sender: Arc<dyn TaskSender>,
}

impl BotContext {
    fn admission(&self) -> AdmissionController {
        AdmissionController::new(self.store.clone(), self.config.quota_window())
    }
}

impl AppState {
    fn bot_ctx(&self) -> BotContext {
        BotContext {
            config: self.config.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            sender: self.sender.clone(),
        }
    }
}

/// Webhook endpoint. Always answers 200: Telegram re-delivers on errors,
/// and a processing failure here is logged, not retried into a storm.
pub async fn webhook(
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> Json<WebhookResponse> {
    if let Err(e) = process_update(&state.bot_ctx(), update).await {
        error!(error = %e, "Failed to process Telegram update");
    }

    Json(WebhookResponse {
        status: "ok".to_string(),
    })
}

fn catalog_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"www\.wildberries\.ru/(catalog|brands)/").unwrap_or_else(|_| {
            // The pattern is a literal; this cannot fail at runtime.
            unreachable!("invalid catalog URL pattern")
        })
    })
}

/// Map a message text to the command it carries
fn route_message(text: &str) -> CommandKind {
    if text.starts_with("/start") {
        CommandKind::Start
    } else if text == "ℹ️ О сервисе" {
        CommandKind::Info
    } else if text == "🚀 Увеличить лимит запросов" {
        CommandKind::NoLimits
    } else if catalog_url_pattern().is_match(text) {
        CommandKind::CatalogRequest
    } else {
        CommandKind::Unknown
    }
}

fn identity(message: &IncomingMessage) -> ChatIdentity {
    let (user_name, full_name) = match &message.from {
        Some(sender) => {
            let mut full_name = sender.first_name.clone().unwrap_or_default();
            if let Some(ref last) = sender.last_name {
                if !full_name.is_empty() {
                    full_name.push(' ');
                }
                full_name.push_str(last);
            }
            (sender.username.clone(), full_name)
        }
        None => (None, String::new()),
    };

    ChatIdentity {
        chat_id: message.chat.id,
        user_name,
        full_name,
    }
}

/// Process one update end to end
pub async fn process_update(ctx: &BotContext, update: TelegramUpdate) -> Result<()> {
    if let Some(message) = update.message {
        let text = message.text.clone().unwrap_or_default();
        return handle_command(ctx, &identity(&message), route_message(&text), &text).await;
    }

    if let Some(query) = update.callback_query {
        if let Some(message) = query.message {
            let command = match query.data.as_deref() {
                Some("keyboard_help_catalog_link") => CommandKind::HelpCatalogLink,
                Some("keyboard_analyse_category") => CommandKind::AnalyseCategory,
                _ => return Ok(()),
            };
            return handle_command(ctx, &identity(&message), command, "").await;
        }
    }

    Ok(())
}

async fn handle_command(
    ctx: &BotContext,
    identity: &ChatIdentity,
    command: CommandKind,
    text: &str,
) -> Result<()> {
    let user = ctx.store.find_or_create_user(identity).await?;
    let entry = ctx.store.append_log(user.chat_id, command, text).await?;
    info!(chat_id = user.chat_id, command = %command, "Command received");

    match command {
        CommandKind::Start => {
            ctx.notifier
                .send_text(user.chat_id, &messages::greeting(&user.full_name))
                .await?;

            let remaining = ctx.admission().remaining(&user).await?.max(0);
            ctx.notifier
                .send_text(
                    user.chat_id,
                    &messages::start_info(remaining, user.daily_catalog_requests_limit),
                )
                .await?;
        }
        CommandKind::Info => {
            ctx.notifier.send_text(user.chat_id, messages::INFO).await?;
        }
        CommandKind::NoLimits => {
            ctx.notifier
                .send_text(user.chat_id, messages::NO_LIMITS)
                .await?;
        }
        CommandKind::HelpCatalogLink => {
            ctx.notifier
                .send_text(user.chat_id, messages::HELP_CATALOG_LINK)
                .await?;
        }
        CommandKind::AnalyseCategory => {
            ctx.notifier
                .send_text(user.chat_id, messages::ANALYSE_CATEGORY)
                .await?;
        }
        CommandKind::CatalogRequest => {
            handle_catalog_request(ctx, &user, entry.id, text).await?;
        }
        CommandKind::Unknown => {
            ctx.notifier
                .send_text(user.chat_id, messages::UNKNOWN_COMMAND)
                .await?;
        }
    }

    Ok(())
}

/// The admission-gated path: enqueue a crawl or explain the refusal.
///
/// `log_id` is the entry the scheduler moves to its terminal status once
/// the submission outcome is known.
async fn handle_catalog_request(
    ctx: &BotContext,
    user: &sellerscope_common::db::models::User,
    log_id: uuid::Uuid,
    category_url: &str,
) -> Result<()> {
    let admission = ctx.admission();

    if admission.can_admit(user).await? {
        metrics::record_admission(true);

        ctx.sender
            .enqueue(TaskMessage::ScheduleCategoryExport {
                category_url: category_url.to_string(),
                chat_id: user.chat_id,
                log_id,
            })
            .await?;
    } else {
        metrics::record_admission(false);

        let next_free_at = admission.next_free_at(user).await?;
        ctx.notifier
            .send_text(user.chat_id, &messages::limit_exhausted(next_free_at))
            .await?;
    }

    Ok(())
}
