use crate::crawler::Classification;
use crate::state::TaskState;
use crate::storage::{StoreError, StoreResult};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Name of the catch-all redirect file at the root of every mirror
pub const REDIRECTS_FILE: &str = "_redirects";

/// Catch-all rule: unknown paths are served the root page with a 404 status
pub const REDIRECTS_RULE: &str = "/*    /index.html   404\n";

/// Subtrees created for every typed class at task setup
const LAYOUT: &[Classification] = &[
    Classification::Css,
    Classification::Js,
    Classification::Image,
    Classification::Font,
];

/// Writes classified payloads below a task root and tallies them
///
/// Each relative path is written at most once per task: when two URLs map to the same
/// file, the first one stored wins.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
    state: TaskState,
    written: Arc<Mutex<HashSet<String>>>,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>, state: TaskState) -> Self {
        Self {
            root: root.into(),
            state,
            written: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The directory every stored path is relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the task root and the `css/ js/ images/ fonts/` subtrees
    ///
    /// A failure here is fatal to the task.
    pub async fn create_layout(&self) -> StoreResult<()> {
        for class in LAYOUT {
            if let Some(subtree) = class.subtree() {
                let dir = self.root.join(subtree);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|source| StoreError::CreateDir { path: dir, source })?;
            }
        }
        Ok(())
    }

    /// Stores a payload at its mapped path
    ///
    /// Never fails past this boundary: I/O errors are logged and the resource is simply
    /// absent from the mirror.
    ///
    /// # Arguments
    ///
    /// * `rel_path` - Task-root relative path from [`crate::storage::path_for`]
    /// * `bytes` - Payload to write
    /// * `class` - Classification whose counter is incremented
    ///
    /// # Returns
    ///
    /// * `Some(PathBuf)` - Absolute path of the written file
    /// * `None` - The path was already written for this task, or the write failed
    pub async fn save(&self, rel_path: &str, bytes: &[u8], class: Classification) -> Option<PathBuf> {
        if !self.claim(rel_path) {
            debug!("Keeping earlier copy of {}", rel_path);
            return None;
        }

        match self.try_save(rel_path, bytes).await {
            Ok(path) => {
                self.state.record_resource(class);
                debug!("Saved {} ({}, {} bytes)", rel_path, class, bytes.len());
                Some(path)
            }
            Err(e) => {
                self.release(rel_path);
                warn!("Dropping resource {}: {}", rel_path, e);
                None
            }
        }
    }

    fn claim(&self, rel_path: &str) -> bool {
        self.written().insert(rel_path.to_string())
    }

    fn release(&self, rel_path: &str) {
        self.written().remove(rel_path);
    }

    fn written(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn try_save(&self, rel_path: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        let target = self.resolve(rel_path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&target, bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: target.clone(),
                source,
            })?;

        Ok(target)
    }

    /// Joins a relative path onto the root, rejecting anything that could escape it
    fn resolve(&self, rel_path: &str) -> StoreResult<PathBuf> {
        let rel = Path::new(rel_path);
        let is_plain = !rel_path.is_empty()
            && rel
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(StoreError::InvalidPath(rel_path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Writes the catch-all `_redirects` file into `root`
pub async fn write_redirects(root: &Path) -> StoreResult<PathBuf> {
    let path = root.join(REDIRECTS_FILE);
    tokio::fs::write(&path, REDIRECTS_RULE)
        .await
        .map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> (ResourceStore, TaskState) {
        let state = TaskState::new("t", "https://example.test/", StrategyKind::Native);
        (ResourceStore::new(dir.path().join("task"), state.clone()), state)
    }

    #[tokio::test]
    async fn test_create_layout() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store(&dir);

        store.create_layout().await.unwrap();

        for sub in ["css", "js", "images", "fonts"] {
            assert!(store.root().join(sub).is_dir(), "missing {}", sub);
        }
    }

    #[tokio::test]
    async fn test_save_creates_parents_and_counts() {
        let dir = TempDir::new().unwrap();
        let (store, state) = store(&dir);

        let path = store
            .save("about/team/index.html", b"<html></html>", Classification::Html)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"<html></html>");
        let stats = state.stats();
        assert_eq!(stats.resources.html, 1);
        assert_eq!(stats.files_written, 1);
    }

    #[tokio::test]
    async fn test_save_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let (store, state) = store(&dir);

        assert!(store.save("../evil.html", b"x", Classification::Html).await.is_none());
        assert!(store.save("/etc/passwd", b"x", Classification::Other).await.is_none());
        assert!(store.save("", b"x", Classification::Other).await.is_none());
        assert_eq!(state.stats().files_written, 0);
    }

    #[tokio::test]
    async fn test_save_failure_is_contained() {
        let dir = TempDir::new().unwrap();
        let (store, state) = store(&dir);
        store.save("page.html", b"file", Classification::Html).await.unwrap();

        // `page.html` is a file, so it cannot become a directory
        let result = store
            .save("page.html/index.html", b"x", Classification::Html)
            .await;

        assert!(result.is_none());
        assert_eq!(state.stats().resources.html, 1);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let dir = TempDir::new().unwrap();
        let (store, state) = store(&dir);

        let first = store
            .save("list/index.html", b"PAGE-ONE", Classification::Html)
            .await;
        let second = store
            .save("list/index.html", b"PAGE-TWO", Classification::Html)
            .await;

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(
            std::fs::read(store.root().join("list/index.html")).unwrap(),
            b"PAGE-ONE"
        );
        let stats = state.stats();
        assert_eq!(stats.resources.html, 1);
        assert_eq!(stats.files_written, 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_claim_path() {
        let dir = TempDir::new().unwrap();
        let (store, state) = store(&dir);
        std::fs::create_dir_all(store.root()).unwrap();
        std::fs::write(store.root().join("blocker"), b"file").unwrap();

        assert!(store.save("blocker/a.css", b"x", Classification::Css).await.is_none());

        std::fs::remove_file(store.root().join("blocker")).unwrap();
        assert!(store.save("blocker/a.css", b"x", Classification::Css).await.is_some());
        assert_eq!(state.stats().resources.css, 1);
    }

    #[tokio::test]
    async fn test_write_redirects() {
        let dir = TempDir::new().unwrap();
        let path = write_redirects(dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "/*    /index.html   404\n");
    }
}
