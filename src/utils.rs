// ABOUTME: Small helpers for the CLI surface
// ABOUTME: Human-readable file sizes and timestamped default output paths

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Format a file size for the completion message
///
/// Sizes above 1 MiB are shown in MB, everything else in KB, both with two
/// decimals.
///
/// # Examples
///
/// ```
/// # use mysql_backup::utils::format_size;
/// assert_eq!(format_size(2048), "2.00 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let size = bytes as f64;

    if size > MB {
        format!("{:.2} MB", size / MB)
    } else {
        format!("{:.2} KB", size / 1024.0)
    }
}

/// Default dump location: `<backup_dir>/backup_YYYYMMDD_HHMMSS.sql`
pub fn default_output_path(backup_dir: &Path, now: NaiveDateTime) -> PathBuf {
    backup_dir.join(format!("backup_{}.sql", now.format("%Y%m%d_%H%M%S")))
}
