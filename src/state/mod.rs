//! State module for tracking mirroring tasks
//!
//! # Components
//!
//! - `TaskStatus`: Lifecycle of a task (initialized, crawling, completed, failed)
//! - `TaskState`: Mutex-protected state shared between a task's worker and its readers
//! - `TaskSnapshot`: Cloned, serializable view of a task handed to callers

mod task_state;
mod task_status;

// Re-export main types
pub use task_state::{ResourceCounts, TaskSnapshot, TaskState, TaskStats};
pub use task_status::TaskStatus;
