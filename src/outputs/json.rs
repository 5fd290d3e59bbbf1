//! JSON checkpoint files.
//!
//! Each stage writes its result as pretty-printed JSON so a later run can
//! resume from it. Korean text is written as-is, not `\u` escaped.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── checkpoint_1_issues_2025-02-06.json
//! └── checkpoint_2_articles_2025-02-06.json
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// File name of the issue digest checkpoint for `date`.
pub fn issues_file_name(date: &str) -> String {
    format!("checkpoint_1_issues_{date}.json")
}

/// File name of the crawled articles checkpoint for `date`.
pub fn articles_file_name(date: &str) -> String {
    format!("checkpoint_2_articles_{date}.json")
}

/// Write `value` to `{output_dir}/{file_name}` as pretty JSON.
///
/// # Arguments
///
/// * `value` - Anything serializable
/// * `output_dir` - Base directory, created if missing
/// * `file_name` - File name inside `output_dir`
///
/// # Returns
///
/// The path written, or an error if directory creation, serialization or
/// the write fails.
#[instrument(level = "info", skip_all, fields(%output_dir, %file_name))]
pub async fn write_checkpoint<T: Serialize>(
    value: &T,
    output_dir: &str,
    file_name: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = Path::new(output_dir).join(file_name);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote checkpoint");
    Ok(path)
}

/// Read a checkpoint written by [`write_checkpoint`].
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_checkpoint<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path.as_ref()).await?;
    let value = serde_json::from_str(&text)?;
    info!("Loaded checkpoint");
    Ok(value)
}
