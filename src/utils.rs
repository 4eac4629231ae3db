//! Helpers for log formatting and reading URL lists from disk.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, never inside a character, and
/// get `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Read a newline-separated URL list.
///
/// Lines are trimmed and blank lines skipped; everything else is passed
/// through untouched, in file order. Malformed URLs are left for the fetcher
/// to reject so they get reported against their position in the batch.
///
/// # Errors
///
/// Fails if `path` does not exist, is not a regular file, or cannot be read.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_url_list(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return Err(format!("File {} does not exist", path.display()).into()),
    };
    if !metadata.is_file() {
        return Err(format!("{} is not a file", path.display()).into());
    }

    let raw = fs::read_to_string(path).await?;
    let urls: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = urls.len(), "Loaded URL list");
    Ok(urls)
}
