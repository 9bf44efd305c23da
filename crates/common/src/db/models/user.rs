//! User entity
//!
//! One row per Telegram chat; created lazily on first contact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Telegram chat id; doubles as the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub chat_id: i64,

    #[sea_orm(column_type = "Text", nullable)]
    pub user_name: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub full_name: String,

    pub daily_catalog_requests_limit: i32,

    pub catalog_requests_blocked: bool,

    pub subscribed_to_category_updates: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::request_log::Entity")]
    RequestLog,
}

impl Related<super::request_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
