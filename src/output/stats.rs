//! Statistics display for finished tasks

use crate::state::TaskSnapshot;

/// Prints task statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `snapshot` - The final snapshot of the task
pub fn print_statistics(snapshot: &TaskSnapshot) {
    println!("{}", format_statistics(snapshot));
}

/// Renders the statistics block printed by [`print_statistics`]
pub fn format_statistics(snapshot: &TaskSnapshot) -> String {
    let stats = &snapshot.stats;
    let resources = &stats.resources;
    let mut out = String::new();

    out.push_str("=== Mirror Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Task: {}\n", snapshot.id));
    out.push_str(&format!("  URL: {}\n", snapshot.url));
    out.push_str(&format!("  Strategy: {}\n", snapshot.strategy));
    out.push_str(&format!("  Status: {}\n", snapshot.status));
    out.push_str(&format!("  URLs discovered: {}\n", stats.total_urls));
    out.push_str(&format!("  URLs processed: {}\n", stats.processed_urls));
    out.push_str(&format!("  URLs failed: {}\n", stats.failed_urls));
    out.push_str(&format!("  Files written: {}\n\n", stats.files_written));

    out.push_str("Resources:\n");
    for (label, count) in [
        ("HTML", resources.html),
        ("CSS", resources.css),
        ("JavaScript", resources.js),
        ("Images", resources.images),
        ("Fonts", resources.fonts),
        ("Other", resources.other),
    ] {
        out.push_str(&format!("  {}: {}\n", label, count));
    }
    out.push('\n');

    if !snapshot.failed.is_empty() {
        out.push_str(&format!("Failed URLs ({}):\n", snapshot.failed.len()));
        for url in &snapshot.failed {
            out.push_str(&format!("  - {}\n", url));
        }
        out.push('\n');
    }

    let success_rate = if stats.processed_urls > 0 {
        let ok = stats.processed_urls.saturating_sub(stats.failed_urls);
        (ok as f64 / stats.processed_urls as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} URLs mirrored)\n",
        success_rate,
        stats.processed_urls.saturating_sub(stats.failed_urls),
        stats.processed_urls
    ));

    match (&snapshot.archive_path, &snapshot.error) {
        (Some(path), _) => out.push_str(&format!("Archive: {}\n", path.display())),
        (None, Some(error)) => out.push_str(&format!("Error: {}\n", error)),
        (None, None) => {}
    }

    out
}
