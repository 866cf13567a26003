//! Mirroring strategies
//!
//! A task produces its mirrored tree through one [`MirrorStrategy`], chosen when the task
//! is created. The controller packages whatever directory the strategy returns, so both
//! strategies yield the same archive format.

use crate::config::{Config, StrategyKind};
use crate::crawler::engine::NativeStrategy;
use crate::crawler::Classification;
use crate::output::ProgressSender;
use crate::state::{ResourceCounts, TaskState};
use crate::storage::{list_files, REDIRECTS_FILE};
use crate::url::BaseDomain;
use crate::{MirrorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// How often a running external tool checks for cancellation
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Directory under the task root that receives the external tool's output
const EXTERNAL_PREFIX_DIR: &str = "site";

/// Everything a strategy needs to mirror one task
pub struct TaskContext {
    pub task_id: String,
    pub start_url: Url,
    pub base: BaseDomain,
    /// `<work-dir>/<task-id>`
    pub root: PathBuf,
    /// Task configuration with request overrides applied
    pub config: Arc<Config>,
    pub state: TaskState,
    pub progress: ProgressSender,
    pub cancel: Arc<AtomicBool>,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn max_urls(&self) -> u32 {
        self.config.crawler.max_urls
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.config.crawler.throttle_ms)
    }
}

/// Produces the mirrored tree of a task
#[async_trait]
pub trait MirrorStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Mirrors `ctx.start_url` and returns the directory to package
    ///
    /// Per-resource failures are recorded in `ctx.state`; an `Err` fails the whole task.
    async fn mirror(&self, ctx: &TaskContext) -> Result<PathBuf>;
}

/// Returns the strategy implementation for `kind`
pub fn strategy_for(kind: StrategyKind, config: &Config) -> Arc<dyn MirrorStrategy> {
    match kind {
        StrategyKind::Native => Arc::new(NativeStrategy),
        StrategyKind::External => Arc::new(ExternalToolStrategy::new(&config.strategy.wget_path)),
    }
}

/// Delegates the whole crawl to a recursive mirroring tool (wget)
#[derive(Debug, Clone)]
pub struct ExternalToolStrategy {
    program: String,
}

impl ExternalToolStrategy {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MirrorStrategy for ExternalToolStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::External
    }

    async fn mirror(&self, ctx: &TaskContext) -> Result<PathBuf> {
        let prefix = ctx.root.join(EXTERNAL_PREFIX_DIR);
        tokio::fs::create_dir_all(&prefix).await?;

        ctx.progress.emit("Started crawling", 0);
        info!(
            "[{}] Running {} for {}",
            ctx.task_id, self.program, ctx.start_url
        );

        let mut child = Command::new(&self.program)
            .args(wget_args(&prefix, &ctx.start_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MirrorError::Tool(format!("Failed to start {}: {}", self.program, e)))?;

        // wget reports each retrieved file on stderr; drain it so the pipe never fills
        if let Some(stderr) = child.stderr.take() {
            let task_id = ctx.task_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{}] wget: {}", task_id, line);
                }
            });
        }

        let mut cancelled = false;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    if ctx.is_cancelled() && !cancelled {
                        info!("[{}] Cancellation requested, stopping {}", ctx.task_id, self.program);
                        cancelled = true;
                        child.start_kill()?;
                    }
                }
            }
        };

        if !cancelled {
            match status.code() {
                Some(0) => {}
                Some(8) => warn!(
                    "[{}] {} finished with server errors, some resources may be missing",
                    ctx.task_id, self.program
                ),
                Some(code) => return Err(MirrorError::Tool(describe_exit_code(code))),
                None => {
                    return Err(MirrorError::Tool(format!(
                        "{} was terminated by a signal",
                        self.program
                    )))
                }
            }
        }

        let site_dir = locate_site_dir(&prefix, &ctx.base).await;
        let resources = count_resources(&site_dir).await?;
        info!(
            "[{}] Mirrored {} files into {}",
            ctx.task_id,
            resources.total(),
            site_dir.display()
        );
        ctx.state.set_resources(resources);
        ctx.progress.emit(
            format!("Downloaded {} files", resources.total()),
            99,
        );

        Ok(site_dir)
    }
}

/// Command-line arguments passed to wget
pub fn wget_args(prefix: &Path, url: &Url) -> Vec<String> {
    vec![
        "--mirror".to_string(),
        "--convert-links".to_string(),
        "--adjust-extension".to_string(),
        "--page-requisites".to_string(),
        "--no-parent".to_string(),
        format!("--directory-prefix={}", prefix.display()),
        "--no-verbose".to_string(),
        "--timeout=30".to_string(),
        "--tries=3".to_string(),
        url.to_string(),
    ]
}

/// Human-readable explanation of a wget exit code
pub fn describe_exit_code(code: i32) -> String {
    match code {
        1 => "Generic error occurred during download. The website might be unavailable or blocked."
            .to_string(),
        2 => "Parse error. The URL format might be invalid.".to_string(),
        3 => "File I/O error. Check disk space and permissions.".to_string(),
        4 => "Network failure. Check your internet connection.".to_string(),
        5 => "SSL verification failed. The website might have certificate issues.".to_string(),
        6 => "Username/password authentication failed.".to_string(),
        7 => "Protocol error. The website might not support the required protocol.".to_string(),
        other => format!(
            "wget failed with error code {}. Please try a different website.",
            other
        ),
    }
}

/// Finds the directory wget created for the site
///
/// Tries `<host[:port]>`, then `www.<host>`, and falls back to the prefix itself.
async fn locate_site_dir(prefix: &Path, base: &BaseDomain) -> PathBuf {
    let candidates = [
        prefix.join(base.host_with_port()),
        prefix.join(format!("www.{}", base.host())),
    ];
    for candidate in candidates {
        if tokio::fs::metadata(&candidate)
            .await
            .map_or(false, |meta| meta.is_dir())
        {
            return candidate;
        }
    }
    prefix.to_path_buf()
}

/// Tallies the files under `dir` by extension
async fn count_resources(dir: &Path) -> Result<ResourceCounts> {
    let dir = dir.to_path_buf();
    let counts = tokio::task::spawn_blocking(move || -> std::io::Result<ResourceCounts> {
        let mut counts = ResourceCounts::default();
        for path in list_files(&dir)? {
            if path == Path::new(REDIRECTS_FILE) {
                continue;
            }
            let class = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Classification::from_file_extension)
                .unwrap_or(Classification::Other);
            counts.record(class);
        }
        Ok(counts)
    })
    .await??;

    Ok(counts)
}
