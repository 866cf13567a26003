//! Native crawl engine
//!
//! The built-in fetch/rewrite/store loop. One URL is processed at a time:
//! - Pop the earliest-enqueued URL from the frontier
//! - Fetch it and classify the payload
//! - Rewrite HTML (feeding new URLs back into the frontier), then store it
//! - Store every other payload under its typed subtree
//!
//! The loop stops when the frontier is empty, the URL ceiling is reached or the task
//! is cancelled.

use crate::crawler::strategy::{MirrorStrategy, TaskContext};
use crate::crawler::{rewrite_page, Classification, Fetcher, Frontier};
use crate::config::StrategyKind;
use crate::output::percent_of;
use crate::storage::{path_for, ResourceStore};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// Progress is reported after every this many processed URLs
const PROGRESS_EVERY: u64 = 2;

/// Strategy running the built-in engine
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeStrategy;

#[async_trait]
impl MirrorStrategy for NativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    async fn mirror(&self, ctx: &TaskContext) -> Result<PathBuf> {
        let mut engine = CrawlEngine::new(ctx).await?;
        engine.run().await;
        Ok(ctx.root.clone())
    }
}

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    FrontierExhausted,
    LimitReached,
    Cancelled,
}

/// State of one native crawl
struct CrawlEngine<'a> {
    ctx: &'a TaskContext,
    fetcher: Fetcher,
    store: ResourceStore,
    frontier: Frontier,
    processed: u64,
}

impl<'a> CrawlEngine<'a> {
    /// Builds the HTTP client, creates the on-disk layout and seeds the frontier
    ///
    /// Any failure here is fatal to the task.
    async fn new(ctx: &'a TaskContext) -> Result<Self> {
        let fetcher = Fetcher::from_config(&ctx.config)?;

        let store = ResourceStore::new(ctx.root.clone(), ctx.state.clone());
        store.create_layout().await?;

        let mut frontier = Frontier::new(ctx.base.clone());
        frontier.seed(ctx.start_url.clone());
        ctx.state.set_discovered(frontier.discovered_count() as u64);

        Ok(Self {
            ctx,
            fetcher,
            store,
            frontier,
            processed: 0,
        })
    }

    async fn run(&mut self) {
        let ctx = self.ctx;
        let max_urls = u64::from(ctx.max_urls());
        let throttle = ctx.throttle();
        let start_time = std::time::Instant::now();

        info!(
            "[{}] Starting native crawl of {} (max {} URLs)",
            ctx.task_id, ctx.start_url, max_urls
        );
        ctx.progress.emit("Started crawling", 0);

        let reason = loop {
            if ctx.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.processed >= max_urls {
                break StopReason::LimitReached;
            }
            let Some((url, pinned)) = self.frontier.pop() else {
                break StopReason::FrontierExhausted;
            };

            let discovered = self.frontier.discovered_count() as u64;
            ctx.progress.emit(
                format!("Processing: {}", url),
                percent_of(self.processed, discovered),
            );

            self.process(&url, pinned).await;

            self.processed += 1;
            ctx.state.record_processed();
            ctx.state
                .set_discovered(self.frontier.discovered_count() as u64);

            if self.processed % PROGRESS_EVERY == 0 {
                ctx.progress.emit(
                    format!("Processed {} of {} URLs", self.processed, max_urls),
                    percent_of(self.processed, max_urls),
                );
            }

            if !throttle.is_zero() && !self.frontier.is_empty() && self.processed < max_urls {
                tokio::time::sleep(throttle).await;
            }
        };

        match reason {
            StopReason::FrontierExhausted => info!(
                "[{}] Frontier is empty, crawl complete",
                ctx.task_id
            ),
            StopReason::LimitReached => info!(
                "[{}] URL limit of {} reached with {} URLs still queued",
                ctx.task_id,
                max_urls,
                self.frontier.pending()
            ),
            StopReason::Cancelled => info!("[{}] Crawl cancelled", ctx.task_id),
        }

        info!(
            "[{}] Crawl finished: {} URLs processed in {:?}",
            ctx.task_id,
            self.processed,
            start_time.elapsed()
        );
    }

    /// Fetches, rewrites and stores one URL
    ///
    /// `pinned` is the classification the URL was first referenced under; it decides the
    /// stored path so that it matches every rewritten reference.
    async fn process(&mut self, url: &Url, pinned: Classification) {
        let state = &self.ctx.state;
        debug!("[{}] Processing URL: {}", self.ctx.task_id, url);

        let resource = match self.fetcher.fetch(url).await {
            Ok(resource) => resource,
            Err(e) => {
                warn!("[{}] {}", self.ctx.task_id, e);
                state.record_failed(url.as_str());
                return;
            }
        };

        debug!(
            "[{}] Fetched {} (HTTP {}, {}, {} bytes)",
            self.ctx.task_id,
            resource.final_url,
            resource.status_code,
            resource.class,
            resource.bytes.len()
        );

        let path = path_for(url, pinned);

        match resource.class {
            Classification::Html => {
                match rewrite_page(
                    &resource.bytes,
                    &resource.content_type,
                    &resource.final_url,
                    &path,
                    &mut self.frontier,
                ) {
                    Ok(page) => {
                        self.store
                            .save(&path, &page.to_bytes(), Classification::Html)
                            .await;
                    }
                    Err(e) => {
                        warn!("[{}] Skipping page: {}", self.ctx.task_id, e);
                        state.record_failed(url.as_str());
                    }
                }
            }
            Classification::Css
            | Classification::Js
            | Classification::Image
            | Classification::Font
            | Classification::Other => {
                self.store.save(&path, &resource.bytes, resource.class).await;
            }
        }
    }
}
