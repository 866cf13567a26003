//! Storage module for the mirrored file tree
//!
//! This module handles everything that touches the task root on disk:
//! - Deterministic URL to path mapping shared by the rewriter and the store
//! - Relative link computation between stored files
//! - Writing classified payloads into their subtrees
//! - The catch-all `_redirects` rule
//! - Listing the files of a mirrored tree

mod error;
mod paths;
mod store;
mod walk;

pub use error::{StoreError, StoreResult};
pub use paths::{path_for, relative_link, short_hash};
pub use store::{write_redirects, ResourceStore, REDIRECTS_FILE, REDIRECTS_RULE};
pub use walk::{list_files, to_slash_path};
