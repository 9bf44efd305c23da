//! Closed enumerations for bot commands and tracked analytics events
//!
//! Replaces the string-keyed lookup tables of earlier revisions: every
//! command and event carries its canonical slug and description as
//! associated data, so an unmapped string can no longer fail a lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of user-issued commands recorded in the request log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// The /start greeting
    Start,
    /// "About the service" reply-keyboard button
    Info,
    /// "Raise my request limit" reply-keyboard button
    NoLimits,
    /// Inline help on how to pick a catalog link
    HelpCatalogLink,
    /// Inline "analyse a category" prompt
    AnalyseCategory,
    /// A submitted catalog URL; the only quota-counted command
    CatalogRequest,
    /// Anything the router did not recognize
    Unknown,
}

impl CommandKind {
    /// Canonical slug stored in the request log
    pub fn slug(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Info => "info",
            CommandKind::NoLimits => "no_limits",
            CommandKind::HelpCatalogLink => "help_catalog_link",
            CommandKind::AnalyseCategory => "analyse_category",
            CommandKind::CatalogRequest => "wb_catalog",
            CommandKind::Unknown => "rnd",
        }
    }

    /// Resolve a stored slug back to its command kind
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "start" => Some(CommandKind::Start),
            "info" => Some(CommandKind::Info),
            "no_limits" => Some(CommandKind::NoLimits),
            "help_catalog_link" => Some(CommandKind::HelpCatalogLink),
            "analyse_category" => Some(CommandKind::AnalyseCategory),
            "wb_catalog" => Some(CommandKind::CatalogRequest),
            "rnd" => Some(CommandKind::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Analytics events emitted to the tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedEvent {
    /// A finished category analysis was delivered; carries the marketplace slug
    CategoryAnalysisReceived { marketplace: String },
    /// Submission was refused because the crawl queue was saturated
    TooLongQueueError,
    /// The user's quota window fully recovered
    RequestsRecovered,
}

impl TrackedEvent {
    /// Human-readable event name sent to the analytics backend
    pub fn description(&self) -> String {
        match self {
            TrackedEvent::CategoryAnalysisReceived { marketplace } => {
                format!("Received {} category analyses", marketplace)
            }
            TrackedEvent::TooLongQueueError => "Received \"Too long queue\" error".to_string(),
            TrackedEvent::RequestsRecovered => "Received \"Recovered requests\" message".to_string(),
        }
    }
}
