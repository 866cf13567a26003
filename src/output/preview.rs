use crate::crawler::extract_title_from_bytes;
use crate::state::ResourceCounts;
use crate::storage::{list_files, to_slash_path};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Pages listed in a preview
pub const PREVIEW_PAGE_LIMIT: usize = 10;

/// Title shown for pages without a `<title>`
pub const NO_TITLE: &str = "No title";

/// One mirrored HTML page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePreview {
    /// Root-relative, `/`-separated path
    pub path: String,
    pub title: String,
}

/// Summary of a mirrored tree
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub pages: Vec<PagePreview>,
    pub resources: ResourceCounts,
    pub total_files: usize,
}

/// Summarizes the tree under `site_root`
///
/// Lists up to [`PREVIEW_PAGE_LIMIT`] HTML pages in path order together with their
/// titles, plus the resource counters and the total number of files.
pub async fn build_preview(
    site_root: &Path,
    resources: ResourceCounts,
) -> Result<Preview, crate::MirrorError> {
    let root: PathBuf = site_root.to_path_buf();
    let preview = tokio::task::spawn_blocking(move || -> std::io::Result<Preview> {
        let files = list_files(&root)?;
        let pages = files
            .iter()
            .filter(|path| is_html(path))
            .take(PREVIEW_PAGE_LIMIT)
            .map(|path| {
                let title = std::fs::read(root.join(path))
                    .ok()
                    .and_then(|bytes| extract_title_from_bytes(&bytes))
                    .unwrap_or_else(|| NO_TITLE.to_string());
                PagePreview {
                    path: to_slash_path(path),
                    title,
                }
            })
            .collect();

        Ok(Preview {
            pages,
            resources,
            total_files: files.len(),
        })
    })
    .await??;

    Ok(preview)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm")
        })
}
