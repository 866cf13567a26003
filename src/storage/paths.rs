//! URL to filesystem path mapping
//!
//! [`path_for`] is the single source of truth for where a URL lives inside a task root.
//! The rewriter links to it and the store writes to it, so a rewritten reference always
//! points at the file holding the referenced resource.

use crate::crawler::Classification;
use sha2::{Digest, Sha256};
use url::Url;

/// Longest file name produced for a typed asset
const MAX_FILENAME_LEN: usize = 100;

const INDEX_FILE: &str = "index.html";

/// Maps a URL to its path relative to the task root
///
/// # Arguments
///
/// * `url` - Normalized absolute URL (fragment already removed)
/// * `class` - Classification pinned for this URL
///
/// # Returns
///
/// A `/`-separated relative path without a leading slash
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::Classification;
/// use sumi_mirror::storage::path_for;
///
/// let root = Url::parse("https://example.test/").unwrap();
/// assert_eq!(path_for(&root, Classification::Html), "index.html");
///
/// let about = Url::parse("https://example.test/about").unwrap();
/// assert_eq!(path_for(&about, Classification::Html), "about/index.html");
/// ```
pub fn path_for(url: &Url, class: Classification) -> String {
    match class.subtree() {
        Some(subtree) => format!("{}/{}", subtree, asset_filename(url, class)),
        None => document_path(url),
    }
}

/// Path of an HTML page or an unclassified file, mirroring the URL path
fn document_path(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return INDEX_FILE.to_string();
    }

    let trimmed = path.trim_start_matches('/');
    if trimmed.ends_with('/') {
        return format!("{}{}", trimmed, INDEX_FILE);
    }

    let last = trimmed.rsplit('/').next().unwrap_or_default();
    if last.contains('.') {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed, INDEX_FILE)
    }
}

/// `<stem>_<hash8><ext>` for a typed asset
fn asset_filename(url: &Url, class: Classification) -> String {
    let segment = url.path().rsplit('/').next().unwrap_or_default();

    let (stem, ext) = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), format!(".{}", ext))
        }
        _ if !segment.is_empty() => (segment.to_string(), class.default_extension().to_string()),
        _ => (
            class.fallback_stem().to_string(),
            class.default_extension().to_string(),
        ),
    };

    let suffix = sanitize(&format!("_{}{}", short_hash(url.as_str()), ext));
    let mut stem = sanitize(&stem);
    let room = MAX_FILENAME_LEN.saturating_sub(suffix.len()).max(1);
    stem.truncate(room);

    let mut name = stem + &suffix;
    name.truncate(MAX_FILENAME_LEN);
    name
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`
fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// First 8 hex digits of the SHA-256 of the input
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

/// Computes the shortest relative reference from one stored page to another path
///
/// Both arguments are task-root relative paths as produced by [`path_for`]. A trailing
/// `index.html` is dropped so directory indexes are linked as their directory; a link to
/// the page's own directory index becomes `./`.
///
/// # Examples
///
/// ```
/// use sumi_mirror::storage::relative_link;
///
/// assert_eq!(relative_link("index.html", "about/index.html"), "about/");
/// assert_eq!(relative_link("about/index.html", "css/site_1a2b3c4d.css"), "../css/site_1a2b3c4d.css");
/// assert_eq!(relative_link("index.html", "index.html"), "./");
/// ```
pub fn relative_link(from_page_path: &str, to_path: &str) -> String {
    let from_dirs: Vec<&str> = {
        let mut parts: Vec<&str> = from_page_path.split('/').collect();
        parts.pop();
        parts
    };
    let to_parts: Vec<&str> = to_path.split('/').collect();
    let (to_dirs, to_file) = to_parts.split_at(to_parts.len() - 1);

    let common = from_dirs
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut link = "../".repeat(from_dirs.len() - common);
    for dir in &to_dirs[common..] {
        link.push_str(dir);
        link.push('/');
    }
    if to_file[0] != INDEX_FILE {
        link.push_str(to_file[0]);
    }

    if link.is_empty() {
        "./".to_string()
    } else {
        link
    }
}
