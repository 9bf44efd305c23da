//! SeaORM entity models
//!
//! Database entities for SellerScope

mod request_log;
mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use request_log::{
    Entity as RequestLogEntity,
    Model as RequestLogEntry,
    ActiveModel as RequestLogActiveModel,
    Column as RequestLogColumn,
    RequestStatus,
};
