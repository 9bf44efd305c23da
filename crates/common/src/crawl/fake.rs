//! Scripted crawl queue for tests
//!
//! Counts, item sets and snapshots are preloaded; submissions are
//! recorded so tests can assert on exactly what was (not) submitted.

use super::{CrawlFlavor, CrawlJobParams, CrawlQueue, ItemRecord, JobState};
use crate::catalog::CategorySnapshot;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    counts: HashMap<(CrawlFlavor, JobState), u64>,
    submissions: Vec<(CrawlFlavor, CrawlJobParams)>,
    submit_error: Option<String>,
    items: HashMap<String, Vec<ItemRecord>>,
    not_ready: Vec<String>,
    snapshots: Option<(CategorySnapshot, CategorySnapshot)>,
}

/// Scripted crawl queue fake
#[derive(Default)]
pub struct FakeCrawlQueue {
    state: Mutex<State>,
}

impl FakeCrawlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the job count for a flavor/state pair
    pub fn set_count(&self, flavor: CrawlFlavor, state: JobState, count: u64) {
        self.state
            .lock()
            .expect("fake poisoned")
            .counts
            .insert((flavor, state), count);
    }

    /// Make every submission fail with a transport error
    pub fn fail_submissions(&self, message: &str) {
        self.state.lock().expect("fake poisoned").submit_error = Some(message.to_string());
    }

    /// Script a finished job's item set
    pub fn set_items(&self, job_key: &str, items: Vec<ItemRecord>) {
        self.state
            .lock()
            .expect("fake poisoned")
            .items
            .insert(job_key.to_string(), items);
    }

    /// Mark a job as not finished yet
    pub fn set_not_ready(&self, job_key: &str) {
        self.state
            .lock()
            .expect("fake poisoned")
            .not_ready
            .push(job_key.to_string());
    }

    /// Script the snapshot pair returned to the differ
    pub fn set_snapshots(&self, previous: CategorySnapshot, latest: CategorySnapshot) {
        self.state.lock().expect("fake poisoned").snapshots = Some((previous, latest));
    }

    /// Every submission the scheduler attempted
    pub fn submissions(&self) -> Vec<(CrawlFlavor, CrawlJobParams)> {
        self.state.lock().expect("fake poisoned").submissions.clone()
    }
}

#[async_trait]
impl CrawlQueue for FakeCrawlQueue {
    async fn count_jobs(&self, flavor: CrawlFlavor, state: JobState) -> Result<u64> {
        Ok(*self
            .state
            .lock()
            .expect("fake poisoned")
            .counts
            .get(&(flavor, state))
            .unwrap_or(&0))
    }

    async fn submit_job(&self, flavor: CrawlFlavor, params: &CrawlJobParams) -> Result<String> {
        let mut state = self.state.lock().expect("fake poisoned");
        if let Some(ref message) = state.submit_error {
            return Err(AppError::Crawl {
                message: message.clone(),
            });
        }
        state.submissions.push((flavor, params.clone()));
        Ok(format!("414324/1/{}", state.submissions.len()))
    }

    async fn fetch_finished_items(&self, job_key: &str) -> Result<Vec<ItemRecord>> {
        let state = self.state.lock().expect("fake poisoned");
        if state.not_ready.iter().any(|k| k == job_key) {
            return Err(AppError::CrawlNotReady {
                job_key: job_key.to_string(),
            });
        }
        Ok(state.items.get(job_key).cloned().unwrap_or_default())
    }

    async fn fetch_category_snapshots(&self) -> Result<(CategorySnapshot, CategorySnapshot)> {
        self.state
            .lock()
            .expect("fake poisoned")
            .snapshots
            .clone()
            .ok_or_else(|| AppError::Crawl {
                message: "Need two finished listing crawls to diff, found 0".to_string(),
            })
    }
}
