//! Crawl queue client abstraction
//!
//! The crawl backend runs named spiders as asynchronous jobs and calls
//! back when a job finishes. The core only submits jobs, inspects queue
//! pressure, and consumes already-extracted structured records; it never
//! fetches raw HTML.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod http;

pub use http::HttpCrawlClient;

use crate::catalog::CategorySnapshot;
use crate::config::CrawlConfig;
use crate::errors::Result;
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Marketplace flavor of a category-export crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlFlavor {
    Wb,
    Ozon,
}

impl CrawlFlavor {
    /// Short slug used in callback URLs and analytics events
    pub fn slug(&self) -> &'static str {
        match self {
            CrawlFlavor::Wb => "WB",
            CrawlFlavor::Ozon => "Ozon",
        }
    }

    /// Marketplace display name
    pub fn marketplace(&self) -> &'static str {
        match self {
            CrawlFlavor::Wb => "Wildberries",
            CrawlFlavor::Ozon => "Ozon",
        }
    }

    /// Spider name for this flavor
    pub fn spider<'a>(&self, config: &'a CrawlConfig) -> &'a str {
        match self {
            CrawlFlavor::Wb => &config.wb_spider,
            CrawlFlavor::Ozon => &config.ozon_spider,
        }
    }

    /// Detect the flavor from a job key (`{project}/{spider_id}/{run}`)
    pub fn detect(job_key: &str, config: &CrawlConfig) -> Option<Self> {
        let re = Regex::new(r"^\d+/(\d+)/\d+$").ok()?;
        let spider_id = re.captures(job_key)?.get(1)?.as_str();

        if spider_id == config.wb_spider_id {
            Some(CrawlFlavor::Wb)
        } else if spider_id == config.ozon_spider_id {
            Some(CrawlFlavor::Ozon)
        } else {
            None
        }
    }
}

/// Crawl job scheduling states reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Finished,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Finished => "finished",
        }
    }
}

/// Parameters for a category-export job submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlJobParams {
    pub category_url: String,
    pub callback_url: String,
    pub callback_params: String,
}

impl CrawlJobParams {
    pub fn new(category_url: &str, callback_url: &str, chat_id: i64) -> Self {
        Self {
            category_url: category_url.to_string(),
            callback_url: callback_url.to_string(),
            callback_params: format!("chat_id={}", chat_id),
        }
    }
}

/// One extracted catalog item from a finished category-export job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub url: String,
    #[serde(alias = "wb_category_name")]
    pub category_name: String,
    #[serde(alias = "wb_category_url")]
    pub category_url: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub purchases: f64,
}

impl ItemRecord {
    /// Revenue attributed to the item over the scraped period
    pub fn turnover(&self) -> f64 {
        self.price * self.purchases
    }
}

/// Client for the external crawl queue.
///
/// `fetch_finished_items` raises [`crate::errors::AppError::CrawlNotReady`]
/// when polled before the job finished; `fetch_category_snapshots` fails
/// loudly when fewer than two finished listing runs exist, so the differ
/// never silently compares against an empty set.
#[async_trait]
pub trait CrawlQueue: Send + Sync {
    /// Number of jobs in the given state for the flavor's spider
    async fn count_jobs(&self, flavor: CrawlFlavor, state: JobState) -> Result<u64>;

    /// Submit a category-export job; returns the job key
    async fn submit_job(&self, flavor: CrawlFlavor, params: &CrawlJobParams) -> Result<String>;

    /// Structured item set of a finished job
    async fn fetch_finished_items(&self, job_key: &str) -> Result<Vec<ItemRecord>>;

    /// The two most recent finished category-listing snapshots,
    /// returned as (previous, latest)
    async fn fetch_category_snapshots(&self) -> Result<(CategorySnapshot, CategorySnapshot)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn crawl_config() -> CrawlConfig {
        AppConfig::default().crawl
    }

    #[test]
    fn test_detect_wb_flavor() {
        let config = crawl_config();
        assert_eq!(
            CrawlFlavor::detect("414324/1/356", &config),
            Some(CrawlFlavor::Wb)
        );
    }

    #[test]
    fn test_detect_ozon_flavor() {
        let config = crawl_config();
        assert_eq!(
            CrawlFlavor::detect("414324/2/77", &config),
            Some(CrawlFlavor::Ozon)
        );
    }

    #[test]
    fn test_detect_unknown_spider() {
        let config = crawl_config();
        assert_eq!(CrawlFlavor::detect("414324/99/1", &config), None);
        assert_eq!(CrawlFlavor::detect("garbage", &config), None);
    }

    #[test]
    fn test_job_params_carry_chat_id() {
        let params = CrawlJobParams::new(
            "https://www.wildberries.ru/catalog/knigi-i-diski",
            "https://bot.example.com/callback/wb_category_export",
            383716,
        );
        assert_eq!(params.callback_params, "chat_id=383716");
    }

    #[test]
    fn test_item_record_accepts_wire_aliases() {
        let json = r#"{
            "name": "Товар",
            "url": "https://www.wildberries.ru/catalog/123/detail.aspx",
            "wb_category_name": "Книги",
            "wb_category_url": "https://www.wildberries.ru/catalog/knigi",
            "price": 760.0,
            "purchases": 3
        }"#;
        let item: ItemRecord = serde_json::from_str(json).unwrap();
        assert_eq!(item.category_name, "Книги");
        assert_eq!(item.turnover(), 2280.0);
    }
}
