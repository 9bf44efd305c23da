//! Crawl-finished callback handlers
//!
//! The crawl backend POSTs here when a job finishes. Category exports
//! carry the job key and the requesting chat; the periodic listing crawl
//! only triggers the snapshot diff broadcast.

use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use sellerscope_common::errors::{AppError, Result};
use sellerscope_common::queue::TaskMessage;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub chat_id: Option<i64>,
    pub job_id: Option<String>,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: String,
}

/// Dispatch a job-finished callback by kind
pub async fn crawl_finished(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    match kind.as_str() {
        "wb_category_export" | "ozon_category_export" => {
            let chat_id = params.chat_id.ok_or_else(|| AppError::Validation {
                message: "chat_id is required for category export callbacks".to_string(),
            })?;
            let job_key = params.job_id.ok_or_else(|| AppError::Validation {
                message: "job_id is required for category export callbacks".to_string(),
            })?;

            info!(kind = %kind, chat_id, job_key = %job_key, "Category export finished");
            state
                .sender
                .enqueue(TaskMessage::CalculateCategoryStats {
                    job_key,
                    chat_id,
                    attempt: 0,
                })
                .await?;
        }
        "category_list" => {
            info!("Category listing crawl finished");
            state
                .sender
                .enqueue(TaskMessage::CompareCategorySnapshots)
                .await?;
        }
        other => {
            return Err(AppError::Validation {
                message: format!("Unknown callback kind: {}", other),
            });
        }
    }

    Ok(Json(CallbackResponse {
        status: "ok".to_string(),
    }))
}
