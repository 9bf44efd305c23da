//! HTTP implementation of the crawl queue client
//!
//! Talks to a Scrapinghub-style job API: job counts and submissions per
//! spider, item download per finished job. Idempotent reads are retried
//! with exponential backoff; submissions are not, since a duplicate
//! submission wastes a crawl slot.

use super::{CrawlFlavor, CrawlJobParams, CrawlQueue, ItemRecord, JobState};
use crate::catalog::{CategoryRecord, CategorySnapshot, SnapshotRank};
use crate::config::CrawlConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Crawl backend client over HTTP
pub struct HttpCrawlClient {
    client: reqwest::Client,
    config: CrawlConfig,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    project: &'a str,
    spider: &'a str,
    job_args: &'a CrawlJobParams,
}

#[derive(Deserialize)]
struct RunResponse {
    jobid: String,
}

#[derive(Deserialize)]
struct JobsListResponse {
    jobs: Vec<JobSummary>,
}

#[derive(Deserialize)]
struct JobSummary {
    id: String,
    state: String,
}

/// One category row from a listing crawl
#[derive(Deserialize)]
struct CategoryRow {
    #[serde(alias = "wb_category_name")]
    name: String,
    #[serde(alias = "wb_category_url")]
    url: String,
}

impl HttpCrawlClient {
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build crawl HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// GET with exponential backoff on transport failures
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(15)),
            ..ExponentialBackoff::default()
        };

        retry(policy, || {
            let url = url.clone();
            async move {
                let mut request = self.client.get(&url);
                if let Some(ref key) = self.config.api_key {
                    request = request.basic_auth(key, Some(""));
                }

                let response = request.send().await.map_err(backoff::Error::transient)?;
                let response = response
                    .error_for_status()
                    .map_err(backoff::Error::permanent)?;
                response
                    .json::<T>()
                    .await
                    .map_err(backoff::Error::permanent)
            }
        })
        .await
        .map_err(Into::into)
    }

    async fn job_state(&self, job_key: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "/api/jobs/list.json?project={}&job={}",
            self.config.project_id, job_key
        ));
        let list: JobsListResponse = self.get_json(url).await?;

        list.jobs
            .into_iter()
            .find(|j| j.id == job_key)
            .map(|j| j.state)
            .ok_or_else(|| AppError::Crawl {
                message: format!("Unknown job {}", job_key),
            })
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, job_key: &str) -> Result<Vec<T>> {
        let url = self.endpoint(&format!(
            "/api/items.json?project={}&job={}",
            self.config.project_id, job_key
        ));
        self.get_json(url).await
    }

    async fn finished_listing_jobs(&self, count: usize) -> Result<Vec<String>> {
        let url = self.endpoint(&format!(
            "/api/jobs/list.json?project={}&spider={}&state=finished&count={}",
            self.config.project_id, self.config.category_list_spider, count
        ));
        let list: JobsListResponse = self.get_json(url).await?;
        // The API returns newest jobs first.
        Ok(list.jobs.into_iter().map(|j| j.id).collect())
    }
}

#[async_trait]
impl CrawlQueue for HttpCrawlClient {
    async fn count_jobs(&self, flavor: CrawlFlavor, state: JobState) -> Result<u64> {
        let url = self.endpoint(&format!(
            "/api/jobs/count.json?project={}&spider={}&state={}",
            self.config.project_id,
            flavor.spider(&self.config),
            state.as_str()
        ));
        let response: CountResponse = self.get_json(url).await?;

        debug!(
            spider = flavor.spider(&self.config),
            state = state.as_str(),
            count = response.count,
            "Queried crawl job count"
        );
        Ok(response.count)
    }

    async fn submit_job(&self, flavor: CrawlFlavor, params: &CrawlJobParams) -> Result<String> {
        let body = RunRequest {
            project: &self.config.project_id,
            spider: flavor.spider(&self.config),
            job_args: params,
        };

        let mut request = self.client.post(self.endpoint("/api/run.json")).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.basic_auth(key, Some(""));
        }

        let response: RunResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(
            category_url = %params.category_url,
            job_key = %response.jobid,
            "Crawl job submitted"
        );
        Ok(response.jobid)
    }

    async fn fetch_finished_items(&self, job_key: &str) -> Result<Vec<ItemRecord>> {
        let state = self.job_state(job_key).await?;
        if state != JobState::Finished.as_str() {
            return Err(AppError::CrawlNotReady {
                job_key: job_key.to_string(),
            });
        }

        self.fetch_rows(job_key).await
    }

    async fn fetch_category_snapshots(&self) -> Result<(CategorySnapshot, CategorySnapshot)> {
        let jobs = self.finished_listing_jobs(2).await?;
        if jobs.len() < 2 {
            // The differ must never silently diff against an empty set.
            return Err(AppError::Crawl {
                message: format!(
                    "Need two finished listing crawls to diff, found {}",
                    jobs.len()
                ),
            });
        }

        let latest_rows: Vec<CategoryRow> = self.fetch_rows(&jobs[0]).await?;
        let previous_rows: Vec<CategoryRow> = self.fetch_rows(&jobs[1]).await?;

        let to_snapshot = |rank, rows: Vec<CategoryRow>| {
            CategorySnapshot::new(
                rank,
                rows.into_iter()
                    .map(|r| CategoryRecord::new(r.name, r.url))
                    .collect(),
            )
        };

        Ok((
            to_snapshot(SnapshotRank::Previous, previous_rows),
            to_snapshot(SnapshotRank::Latest, latest_rows),
        ))
    }
}
