//! Task controller
//!
//! Starts one mirroring task on its own tokio task and hands back a [`TaskHandle`].
//! The spawned worker drives the task through its lifecycle:
//! 1. Create `<work-dir>/<task-id>/`
//! 2. Run the selected [`MirrorStrategy`]
//! 3. Write the catch-all `_redirects` rule into the mirrored tree
//! 4. Package the tree, falling back to a placeholder archive
//! 5. Publish the terminal event, wait for the reporter to drain, then signal completion
//!
//! Completion is signaled explicitly through a `watch` channel; callers never have to
//! guess from elapsed time.

use crate::config::Config;
use crate::crawler::registry::TaskRequest;
use crate::crawler::strategy::{strategy_for, MirrorStrategy, TaskContext};
use crate::output::{
    build_archive, build_placeholder, build_preview, progress_channel, spawn_reporter, EventKind,
    Preview, ProgressSubscriber, PROGRESS_QUEUE_CAPACITY,
};
use crate::state::{TaskSnapshot, TaskState, TaskStatus};
use crate::storage::write_redirects;
use crate::url::{normalize_start_url, BaseDomain};
use crate::{MirrorError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Caller-side handle of a running or finished task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: String,
    state: TaskState,
    root: PathBuf,
    cancel: Arc<AtomicBool>,
    done: watch::Receiver<TaskStatus>,
}

/// Starts a mirroring task and returns immediately
///
/// The request overrides are applied on top of `config` and validated before anything
/// is spawned.
///
/// # Arguments
///
/// * `config` - Base configuration shared by every task
/// * `request` - Start URL plus per-task overrides
/// * `subscriber` - Receives the task's progress events
///
/// # Returns
///
/// * `Ok(TaskHandle)` - The task is running
/// * `Err(MirrorError)` - The URL or the overrides were rejected
pub fn start(
    config: &Config,
    request: &TaskRequest,
    subscriber: Arc<dyn ProgressSubscriber>,
) -> Result<TaskHandle> {
    let start_url = normalize_start_url(&request.url)?;
    let base = BaseDomain::from_url(&start_url)?;
    let config = Arc::new(request.task_config(config)?);

    let id = Uuid::new_v4().to_string();
    let strategy = strategy_for(config.strategy.kind, &config);
    let root = PathBuf::from(&config.output.work_dir).join(&id);
    let state = TaskState::new(id.clone(), start_url.as_str(), strategy.kind());
    let cancel = Arc::new(AtomicBool::new(false));

    let (progress, rx) = progress_channel(id.clone(), state.clone(), PROGRESS_QUEUE_CAPACITY);
    let reporter = spawn_reporter(rx, subscriber);
    let (done_tx, done_rx) = watch::channel(TaskStatus::Initialized);

    info!(
        "[{}] Task created for {} ({} strategy, max {} URLs)",
        id,
        start_url,
        strategy.kind(),
        config.crawler.max_urls
    );

    let ctx = TaskContext {
        task_id: id.clone(),
        start_url,
        base,
        root: root.clone(),
        config,
        state: state.clone(),
        progress,
        cancel: Arc::clone(&cancel),
    };
    tokio::spawn(run_task(ctx, strategy, reporter, done_tx));

    Ok(TaskHandle {
        id,
        state,
        root,
        cancel,
        done: done_rx,
    })
}

/// Worker body of one task
async fn run_task(
    ctx: TaskContext,
    strategy: Arc<dyn MirrorStrategy>,
    reporter: JoinHandle<usize>,
    done: watch::Sender<TaskStatus>,
) {
    let state = ctx.state.clone();
    let task_id = ctx.task_id.clone();
    state.set_status(TaskStatus::Crawling);
    let _ = done.send(TaskStatus::Crawling);

    match execute(&ctx, strategy.as_ref()).await {
        Ok(archive) => {
            info!("[{}] Task completed: {}", task_id, archive.display());
            state.complete(archive);
            ctx.progress
                .finish(EventKind::Completed, "Crawling completed")
                .await;
        }
        Err(e) => {
            error!("[{}] Task failed: {}", task_id, e);
            state.fail(e.to_string());
            ctx.progress
                .finish(EventKind::Failed, format!("Crawling failed: {}", e))
                .await;
        }
    }

    // The reporter stops once the last sender is gone and the queue is drained
    drop(ctx);
    match reporter.await {
        Ok(delivered) => debug!("[{}] Reporter delivered {} events", task_id, delivered),
        Err(e) => warn!("[{}] Reporter stopped abnormally: {}", task_id, e),
    }

    let _ = done.send(state.status());
}

/// Mirrors and packages one task; any error fails the task
async fn execute(ctx: &TaskContext, strategy: &dyn MirrorStrategy) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&ctx.root).await?;

    let site_root = strategy.mirror(ctx).await?;
    ctx.state.set_site_root(site_root.clone());

    if let Err(e) = write_redirects(&site_root).await {
        warn!("[{}] Could not write redirect rule: {}", ctx.task_id, e);
    }

    let output_dir = Path::new(&ctx.config.output.work_dir);
    let archive = match build_archive(&site_root, &ctx.base, output_dir).await {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "[{}] Archive creation failed, writing placeholder: {}",
                ctx.task_id, e
            );
            build_placeholder(&ctx.base, output_dir).await?
        }
    };

    ctx.progress.emit("ZIP file created", 99);
    Ok(archive)
}

impl TaskHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Consistent copy of the task's state and counters
    pub fn status(&self) -> TaskSnapshot {
        self.state.snapshot()
    }

    /// Working directory of the task, `<work-dir>/<task-id>`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Requests early termination
    ///
    /// The native engine stops before its next URL; the external tool is killed. Whatever
    /// was mirrored so far is still packaged.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Resolves once the task is completed or failed and every event has been delivered
    pub async fn wait(&self) -> TaskSnapshot {
        let mut done = self.done.clone();
        loop {
            if done.borrow_and_update().is_terminal() {
                break;
            }
            // Sender gone: the worker is finished (or panicked)
            if done.changed().await.is_err() {
                break;
            }
        }
        self.state.snapshot()
    }

    /// Archive path of a completed task
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - The task completed and its archive exists
    /// * `Err(MirrorError::TaskNotReady)` - The task is still running or failed
    pub fn download_path(&self) -> Result<PathBuf> {
        let snapshot = self.state.snapshot();
        match (snapshot.status, snapshot.archive_path) {
            (TaskStatus::Completed, Some(path)) => Ok(path),
            (status, _) => Err(MirrorError::TaskNotReady {
                id: self.id.clone(),
                status,
            }),
        }
    }

    /// Summary of the mirrored tree (pages with titles, counters, file count)
    pub async fn preview(&self) -> Result<Preview> {
        let snapshot = self.state.snapshot();
        let site_root = snapshot.site_root.unwrap_or_else(|| self.root.clone());
        build_preview(&site_root, snapshot.stats.resources).await
    }

    /// Removes the task's working tree, keeping the archive
    pub async fn remove_tree(&self) -> Result<()> {
        remove_if_exists(&self.root, true).await
    }

    /// Cancels the task if needed, waits for it and removes everything it wrote
    pub async fn cleanup(&self) -> Result<()> {
        self.cancel();
        let snapshot = self.wait().await;

        self.remove_tree().await?;
        if let Some(archive) = snapshot.archive_path {
            remove_if_exists(&archive, false).await?;
        }

        info!("[{}] Task files removed", self.id);
        Ok(())
    }
}

async fn remove_if_exists(path: &Path, dir: bool) -> Result<()> {
    let result = if dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
