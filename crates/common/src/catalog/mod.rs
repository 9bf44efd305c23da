//! Category snapshot types and derived display fields
//!
//! A snapshot is one crawl run's listing of marketplace categories. Two
//! records are the same category iff both the display name and the URL
//! match byte for byte.

pub mod diff;
pub mod export;

pub use diff::{Partition, PartitionTable, SnapshotDiff, SnapshotDiffer};

use serde::{Deserialize, Serialize};

/// Search-page template used for the derived search URL
const SEARCH_URL_TEMPLATE: &str = "https://www.wildberries.ru/catalog/0/search.aspx?search=";

/// Minimal identity of a catalog category within one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
    pub url: String,
}

impl CategoryRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Recency rank of a snapshot within a diff run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotRank {
    /// The most recent finished listing crawl
    Latest,
    /// The run before it
    Previous,
}

/// One crawl run's captured category listing. Held in memory only for the
/// duration of a diff computation; never persisted.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub rank: SnapshotRank,
    pub records: Vec<CategoryRecord>,
}

impl CategorySnapshot {
    pub fn new(rank: SnapshotRank, records: Vec<CategoryRecord>) -> Self {
        Self { rank, records }
    }
}

/// Category type derived from the URL path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    NewArrivals,
    Promo,
    Regular,
}

impl CategoryType {
    /// Display label used in exports and messages
    pub fn label(&self) -> &'static str {
        match self {
            CategoryType::NewArrivals => "Новинки",
            CategoryType::Promo => "Промо",
            CategoryType::Regular => "Обычная",
        }
    }
}

/// Classify a category URL by ordered substring match; first match wins
pub fn classify_url(url: &str) -> CategoryType {
    if url.contains("/novinki") {
        CategoryType::NewArrivals
    } else if url.contains("/promotions") {
        CategoryType::Promo
    } else {
        CategoryType::Regular
    }
}

/// Percent-encoded search URL for a category display name
pub fn search_url(name: &str) -> String {
    format!("{}{}", SEARCH_URL_TEMPLATE, urlencoding::encode(name))
}

/// A category record augmented with its derived display fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedCategory {
    pub name: String,
    pub url: String,
    pub search_url: String,
    pub category_type: CategoryType,
}

impl From<&CategoryRecord> for EnrichedCategory {
    fn from(record: &CategoryRecord) -> Self {
        Self {
            name: record.name.clone(),
            url: record.url.clone(),
            search_url: search_url(&record.name),
            category_type: classify_url(&record.url),
        }
    }
}
