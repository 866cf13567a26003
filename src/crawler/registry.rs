//! Task registry
//!
//! Owns the table of live tasks for a front end. The registry is created once and
//! passed to whatever serves requests; there is no process-wide task table.

use crate::config::{validate_crawler_config, Config, StrategyKind};
use crate::crawler::controller::{self, TaskHandle};
use crate::output::{Preview, ProgressSubscriber};
use crate::state::TaskSnapshot;
use crate::{ConfigResult, MirrorError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Parameters of a new task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRequest {
    /// Start URL; `http://` is assumed when no scheme is given
    pub url: String,
    /// Overrides `crawler.max-urls`
    pub max_urls: Option<u32>,
    /// Overrides `crawler.throttle-ms`
    pub throttle_ms: Option<u64>,
    /// Overrides `strategy.kind`
    pub strategy: Option<StrategyKind>,
}

impl TaskRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_urls(mut self, max_urls: u32) -> Self {
        self.max_urls = Some(max_urls);
        self
    }

    pub fn with_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.throttle_ms = Some(throttle_ms);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Applies the overrides on top of `base` and validates the result
    pub(crate) fn task_config(&self, base: &Config) -> ConfigResult<Config> {
        let mut config = base.clone();
        if let Some(max_urls) = self.max_urls {
            config.crawler.max_urls = max_urls;
        }
        if let Some(throttle_ms) = self.throttle_ms {
            config.crawler.throttle_ms = throttle_ms;
        }
        if let Some(strategy) = self.strategy {
            config.strategy.kind = strategy;
        }
        validate_crawler_config(&config.crawler)?;
        Ok(config)
    }
}

/// Table of tasks keyed by task id
pub struct TaskRegistry {
    config: Arc<Config>,
    subscriber: Arc<dyn ProgressSubscriber>,
    tasks: Mutex<HashMap<String, TaskHandle>>,
}

impl TaskRegistry {
    /// Creates an empty registry; every task publishes its events to `subscriber`
    pub fn new(config: Config, subscriber: Arc<dyn ProgressSubscriber>) -> Self {
        Self {
            config: Arc::new(config),
            subscriber,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, TaskHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a task and registers its handle
    pub fn create(&self, request: &TaskRequest) -> Result<TaskHandle> {
        let handle = controller::start(&self.config, request, Arc::clone(&self.subscriber))?;
        self.tasks()
            .insert(handle.id().to_string(), handle.clone());
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Result<TaskHandle> {
        self.tasks()
            .get(id)
            .cloned()
            .ok_or_else(|| MirrorError::TaskNotFound(id.to_string()))
    }

    pub fn status(&self, id: &str) -> Result<TaskSnapshot> {
        Ok(self.get(id)?.status())
    }

    /// Snapshots of every registered task, oldest first
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> =
            self.tasks().values().map(TaskHandle::status).collect();
        snapshots.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        snapshots
    }

    /// Archive path of a completed task
    pub fn download(&self, id: &str) -> Result<PathBuf> {
        self.get(id)?.download_path()
    }

    pub async fn preview(&self, id: &str) -> Result<Preview> {
        self.get(id)?.preview().await
    }

    /// Unregisters a task and removes its files
    pub async fn cleanup(&self, id: &str) -> Result<()> {
        let handle = self
            .tasks()
            .remove(id)
            .ok_or_else(|| MirrorError::TaskNotFound(id.to_string()))?;
        handle.cleanup().await?;
        info!("[{}] Task cleaned up", id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NullSubscriber;
    use crate::state::TaskStatus;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> TaskRegistry {
        let mut config = Config::default();
        config.output.work_dir = dir.path().to_string_lossy().into_owned();
        config.strategy.wget_path = "/nonexistent/bin/wget-missing".to_string();
        TaskRegistry::new(config, Arc::new(NullSubscriber))
    }

    #[test]
    fn test_task_config_applies_overrides() {
        let base = Config::default();
        let request = TaskRequest::new("example.test")
            .with_max_urls(3)
            .with_throttle_ms(0)
            .with_strategy(StrategyKind::External);

        let config = request.task_config(&base).unwrap();

        assert_eq!(config.crawler.max_urls, 3);
        assert_eq!(config.crawler.throttle_ms, 0);
        assert_eq!(config.strategy.kind, StrategyKind::External);
        assert_eq!(base.crawler.max_urls, 15);
    }

    #[test]
    fn test_task_config_rejects_invalid_overrides() {
        let base = Config::default();
        assert!(TaskRequest::new("example.test")
            .with_max_urls(20_000)
            .task_config(&base)
            .is_err());
        assert!(TaskRequest::new("example.test")
            .with_throttle_ms(120_000)
            .task_config(&base)
            .is_err());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        assert!(matches!(registry.get("nope"), Err(MirrorError::TaskNotFound(_))));
        assert!(matches!(registry.download("nope"), Err(MirrorError::TaskNotFound(_))));
        assert!(matches!(
            registry.cleanup("nope").await,
            Err(MirrorError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_list_cleanup() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let handle = registry
            .create(&TaskRequest::new("example.test").with_strategy(StrategyKind::External))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].id, handle.id());

        let snapshot = handle.wait().await;
        assert_eq!(snapshot.status, TaskStatus::Failed);
        assert_eq!(registry.status(handle.id()).unwrap().status, TaskStatus::Failed);

        registry.cleanup(handle.id()).await.unwrap();
        assert!(registry.is_empty());
        assert!(!dir.path().join(handle.id()).exists());
    }
}
