/// Task status definitions for tracking mirroring progress
///
/// A task moves `Initialized -> Crawling -> Completed | Failed` and never leaves a
/// terminal status.
use serde::Serialize;
use std::fmt;

/// Represents the lifecycle status of a mirroring task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task has been created but its worker has not started yet
    #[default]
    Initialized,

    /// Worker is fetching, rewriting or packaging
    Crawling,

    // ===== Terminal States =====
    /// Archive was produced and can be downloaded
    Completed,

    /// Task stopped on an unrecoverable error
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal status (the worker has finished)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the lowercase wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its wire representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initialized" => Some(Self::Initialized),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
