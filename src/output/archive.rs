//! Archive builder
//!
//! Packages a mirrored tree into a deflate zip that can be dropped onto a static host
//! as-is. Every archive starts with the catch-all `_redirects` entry, so even a crawl
//! that stored nothing produces a deployable file.

use crate::storage::{list_files, to_slash_path, REDIRECTS_FILE, REDIRECTS_RULE};
use crate::url::BaseDomain;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Page shipped in the archive when the real one could not be built
pub const PLACEHOLDER_HTML: &str = "<html><body><h1>Minimal download</h1><p>The crawl did not complete properly.</p></body></html>";

/// Errors that can occur while writing an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive file name: `<domain with non-alphanumerics as '_'>_<unix seconds>.zip`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::output::archive_name;
/// use sumi_mirror::url::BaseDomain;
///
/// let base = BaseDomain::from_url(&Url::parse("https://example.com/").unwrap()).unwrap();
/// assert_eq!(archive_name(&base, 1700000000), "example_com_1700000000.zip");
/// ```
pub fn archive_name(base: &BaseDomain, timestamp: i64) -> String {
    format!("{}_{}.zip", base.archive_stem(), timestamp)
}

/// Packages `site_root` into a zip placed in `output_dir`
///
/// Entry names are relative to the root and `/`-separated. The `_redirects` rule is
/// written first; an on-disk `_redirects` at the root is not duplicated. A missing or
/// partially populated root is tolerated.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written archive
/// * `Err(ArchiveError)` - The archive could not be written
pub async fn build(site_root: &Path, base: &BaseDomain, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let site_root = site_root.to_path_buf();
    let output_dir = output_dir.to_path_buf();
    let stem = archive_name(base, chrono::Utc::now().timestamp());

    let (path, entries) = tokio::task::spawn_blocking(move || -> ArchiveResult<(PathBuf, usize)> {
        let (path, file) = create_unique(&output_dir, &stem)?;
        let entries = write_site(file, &site_root).map_err(|e| {
            let _ = std::fs::remove_file(&path);
            e
        })?;
        Ok((path, entries))
    })
    .await??;

    info!("Archive {} created with {} entries", path.display(), entries);
    Ok(path)
}

/// Writes the minimal fallback archive (`_redirects` plus a one-page `index.html`)
pub async fn build_placeholder(base: &BaseDomain, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let output_dir = output_dir.to_path_buf();
    let stem = archive_name(base, chrono::Utc::now().timestamp());

    let path = tokio::task::spawn_blocking(move || -> ArchiveResult<PathBuf> {
        let (path, file) = create_unique(&output_dir, &stem)?;
        let mut zip = ZipWriter::new(file);
        let options = entry_options();

        zip.start_file(REDIRECTS_FILE, options)?;
        zip.write_all(REDIRECTS_RULE.as_bytes())?;
        zip.start_file("index.html", options)?;
        zip.write_all(PLACEHOLDER_HTML.as_bytes())?;
        zip.finish()?;

        Ok(path)
    })
    .await??;

    warn!("Placeholder archive {} created", path.display());
    Ok(path)
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

/// Creates the archive file, adding `_<n>` before the extension if the name is taken
fn create_unique(output_dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(output_dir)?;
    let stem = name.trim_end_matches(".zip");

    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            output_dir.join(name)
        } else {
            output_dir.join(format!("{}_{}.zip", stem, attempt))
        };

        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Writes `_redirects` followed by every file of the tree; returns the entry count
fn write_site(file: File, site_root: &Path) -> ArchiveResult<usize> {
    let mut zip = ZipWriter::new(file);
    let options = entry_options();

    zip.start_file(REDIRECTS_FILE, options)?;
    zip.write_all(REDIRECTS_RULE.as_bytes())?;
    let mut entries = 1;

    for relative in list_files(site_root)? {
        let name = to_slash_path(&relative);
        if name == REDIRECTS_FILE {
            continue;
        }

        let bytes = std::fs::read(site_root.join(&relative))?;
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}
