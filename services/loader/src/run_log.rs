//! Daily run log files.
//!
//! Every pass appends its status lines to `dataloader_<YYYY-MM-DD>.log`,
//! followed by a blank line.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Path of the log file for `date`.
pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("dataloader_{}.log", date.format("%Y-%m-%d")))
}

/// Append one run's lines to the log file for `date`, creating it if needed.
pub async fn append(log_dir: &Path, date: NaiveDate, lines: &[String]) -> Result<PathBuf> {
    let path = log_file_path(log_dir, date);

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("Failed to open run log: {}", path.display()))?;

    let mut entry = lines.join("\n");
    entry.push_str("\n\n");

    file.write_all(entry.as_bytes())
        .await
        .with_context(|| format!("Failed to write run log: {}", path.display()))?;
    file.flush().await?;

    Ok(path)
}
