//! Chat history export files
//!
//! An export is a pretty-printed JSON array of `HistoryRecord`s named
//! `chat_history_YYYYMMDD_HHMMSS.json` after the local time of export.
//! Exports never overwrite: a second export in the same second gets a
//! `_1`, `_2`, ... suffix.

use chrono::{DateTime, Local};
use pdfchat_core::{HistoryRecord, PdfChatError, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffixes tried before giving up on a crowded second
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// File name for an export taken at `now`
pub fn history_filename(now: DateTime<Local>) -> String {
    format!("chat_history_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write `records` into `dir` and return the file path
pub fn write_history(records: &[HistoryRecord], dir: &Path) -> Result<PathBuf> {
    write_history_at(records, dir, Local::now())
}

fn write_history_at(records: &[HistoryRecord], dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    if records.is_empty() {
        return Err(PdfChatError::EmptyHistory);
    }

    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(records)?;
    let base = history_filename(now);
    let stem = base.trim_end_matches(".json");

    let mut attempt = 0;
    let path = loop {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{stem}_{attempt}.json")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())?;
                break path;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "Chat history exported"
    );
    Ok(path)
}

/// Read an export back into records
pub fn load_history(path: &Path) -> Result<Vec<HistoryRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
