//! Crawler module for mirroring a site
//!
//! This module contains the mirroring logic, including:
//! - Resource classification
//! - HTTP fetching with retry logic
//! - Character set decoding of pages
//! - The frontier of same-origin URLs
//! - HTML link rewriting
//! - The native crawl engine and the external tool strategy
//! - Task control and the task registry

mod classify;
mod controller;
mod decode;
mod engine;
mod fetcher;
mod frontier;
mod registry;
mod rewriter;
mod strategy;

pub use classify::{Classification, ReferenceContext};
pub use controller::{start, TaskHandle};
pub use engine::NativeStrategy;
pub use fetcher::{build_http_client, FetchError, FetchedResource, Fetcher};
pub use frontier::{Enqueued, Frontier};
pub use registry::{TaskRegistry, TaskRequest};
pub use rewriter::{extract_title_from_bytes, rewrite_page, RewriteError, RewrittenPage};
pub use strategy::{
    describe_exit_code, strategy_for, wget_args, ExternalToolStrategy, MirrorStrategy,
    TaskContext,
};
