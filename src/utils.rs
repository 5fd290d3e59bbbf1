//! Utility functions for text normalisation, dates, logging and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Unicode/whitespace normalisation of article text and titles
//! - Publication date cleanup for output records
//! - String truncation for logging
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use unicode_normalization::UnicodeNormalization;

static HORIZONTAL_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalise article text or a title.
///
/// Applies NFKC, converts CRLF to LF, squeezes runs of spaces and tabs to a
/// single space and runs of three or more newlines to one blank line, then
/// trims.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_text("  가\t\t나\r\n\r\n\r\n\r\n다 "), "가 나\n\n다");
/// ```
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s: String = s.nfkc().collect();
    let s = s.replace("\r\n", "\n");
    let s = HORIZONTAL_WS_RE.replace_all(&s, " ");
    BLANK_RUN_RE.replace_all(s.trim(), "\n\n").into_owned()
}

/// Length in Unicode scalar values, the unit every length threshold uses.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Convert a publication timestamp to `YYYY-MM-DD`.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD` and `YYYYMMDD`. Anything else is returned unchanged.
pub fn clean_date(raw: &str) -> String {
    let raw_trim = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw_trim) {
        return dt.format("%Y-%m-%d").to_string();
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw_trim, fmt) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw_trim, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always land on a character boundary, so
/// Korean text is safe.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
