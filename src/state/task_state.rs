use crate::config::StrategyKind;
use crate::crawler::Classification;
use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of stored resources per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceCounts {
    pub html: u64,
    pub css: u64,
    pub js: u64,
    pub images: u64,
    pub fonts: u64,
    pub other: u64,
}

impl ResourceCounts {
    /// Increments the counter matching the classification
    pub fn record(&mut self, class: Classification) {
        match class {
            Classification::Html => self.html += 1,
            Classification::Css => self.css += 1,
            Classification::Js => self.js += 1,
            Classification::Image => self.images += 1,
            Classification::Font => self.fonts += 1,
            Classification::Other => self.other += 1,
        }
    }

    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.html + self.css + self.js + self.images + self.fonts + self.other
    }
}

/// Monotonic counters of one task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// URLs ever discovered (enqueued) by the task
    pub total_urls: u64,

    /// URLs popped and fetched, successfully or not
    pub processed_urls: u64,

    /// URLs whose fetch, decode or parse failed
    pub failed_urls: u64,

    /// Files written to the task root
    pub files_written: u64,

    pub resources: ResourceCounts,
}

/// Point-in-time copy of a task, safe to hand to any reader
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub url: String,
    pub status: TaskStatus,
    pub strategy: StrategyKind,
    pub stats: TaskStats,
    pub started_at: DateTime<Utc>,

    /// Directory the strategy mirrored into, known once the strategy returned
    pub site_root: Option<PathBuf>,

    /// Set only once the task completed
    pub archive_path: Option<PathBuf>,

    /// Set only once the task failed
    pub error: Option<String>,

    /// URLs that could not be mirrored, in processing order
    pub failed: Vec<String>,
}

/// Shared, mutex-protected task state
///
/// The controller is the only writer; every reader gets a cloned [`TaskSnapshot`].
/// A poisoned lock is recovered rather than propagated since every update is a plain
/// counter or field assignment.
#[derive(Debug, Clone)]
pub struct TaskState {
    inner: Arc<Mutex<TaskSnapshot>>,
}

impl TaskState {
    /// Creates the state of a freshly initialized task
    pub fn new(id: impl Into<String>, url: impl Into<String>, strategy: StrategyKind) -> Self {
        let snapshot = TaskSnapshot {
            id: id.into(),
            url: url.into(),
            status: TaskStatus::Initialized,
            strategy,
            stats: TaskStats::default(),
            started_at: Utc::now(),
            site_root: None,
            archive_path: None,
            error: None,
            failed: Vec::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(snapshot)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a consistent copy of status and counters
    pub fn snapshot(&self) -> TaskSnapshot {
        self.lock().clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    pub fn stats(&self) -> TaskStats {
        self.lock().stats.clone()
    }

    pub fn set_status(&self, status: TaskStatus) {
        self.lock().status = status;
    }

    /// Records the current size of the discovered set
    pub fn set_discovered(&self, total: u64) {
        let mut guard = self.lock();
        guard.stats.total_urls = guard.stats.total_urls.max(total);
    }

    pub fn record_processed(&self) {
        self.lock().stats.processed_urls += 1;
    }

    /// Records a URL that could not be mirrored
    pub fn record_failed(&self, url: &str) {
        let mut guard = self.lock();
        guard.stats.failed_urls += 1;
        guard.failed.push(url.to_string());
    }

    /// Records one stored file of the given classification
    pub fn record_resource(&self, class: Classification) {
        let mut guard = self.lock();
        guard.stats.resources.record(class);
        guard.stats.files_written += 1;
    }

    /// Replaces the resource counters wholesale (external tool strategy)
    pub fn set_resources(&self, resources: ResourceCounts) {
        let mut guard = self.lock();
        guard.stats.files_written = resources.total();
        guard.stats.resources = resources;
    }

    pub fn set_site_root(&self, root: PathBuf) {
        self.lock().site_root = Some(root);
    }

    /// Marks the task completed with its archive
    pub fn complete(&self, archive_path: PathBuf) {
        let mut guard = self.lock();
        guard.archive_path = Some(archive_path);
        guard.error = None;
        guard.status = TaskStatus::Completed;
    }

    /// Marks the task failed with a message
    pub fn fail(&self, message: impl Into<String>) {
        let mut guard = self.lock();
        guard.archive_path = None;
        guard.error = Some(message.into());
        guard.status = TaskStatus::Failed;
    }
}
