//! Request log entity
//!
//! Append-only log of user commands; the quota count is derived from this
//! table rather than kept in a counter column, so the count can never
//! drift from the log. `created_at` is written once and never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Terminal and transitional states of a logged request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Success,
    TooLongQueue,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Success => "success",
            RequestStatus::TooLongQueue => "too_long_queue",
            RequestStatus::Failed => "failed",
        }
    }

    /// Parse a stored status; empty or unknown strings map to `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "success" => Some(RequestStatus::Success),
            "too_long_queue" => Some(RequestStatus::TooLongQueue),
            "failed" => Some(RequestStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub chat_id: i64,

    #[sea_orm(column_type = "Text")]
    pub command: String,

    #[sea_orm(column_type = "Text")]
    pub payload: String,

    /// Unset until the asynchronous job outcome is known
    #[sea_orm(column_type = "Text", nullable)]
    pub status: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Stored status as an enum; `None` for unset or unknown values
    pub fn request_status(&self) -> Option<RequestStatus> {
        self.status.as_deref().and_then(RequestStatus::parse)
    }

    /// Whether this entry consumes a quota slot
    pub fn counts_against_quota(&self) -> bool {
        self.request_status() == Some(RequestStatus::Success)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ChatId",
        to = "super::user::Column::ChatId"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
