//! Output module for packaging and reporting mirroring tasks
//!
//! This module handles:
//! - Building the deployable zip archive (and the placeholder fallback)
//! - Publishing progress events to subscribers
//! - Previewing a mirrored tree
//! - Printing task statistics

mod archive;
mod preview;
pub mod progress;
pub mod stats;

pub use archive::{
    archive_name, build as build_archive, build_placeholder, ArchiveError, ArchiveResult,
    PLACEHOLDER_HTML,
};
pub use preview::{build_preview, PagePreview, Preview, NO_TITLE, PREVIEW_PAGE_LIMIT};
pub use progress::{
    percent_of, progress_channel, spawn_reporter, ChannelSubscriber, EventKind, LogSubscriber,
    NullSubscriber, ProgressEvent, ProgressSender, ProgressSubscriber, PROGRESS_QUEUE_CAPACITY,
};
pub use stats::{format_statistics, print_statistics};
