#![cfg(feature = "web")]

use chrono::{Local, NaiveDateTime};
use log::info;
use serde::Serialize;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::layout::initialize_sheet;
use crate::store::{SheetStore, StoreError};

const MAX_SAME_SECOND_BACKUPS: u32 = 1000;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("backup i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not build workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Convert sheet rows to CSV format
///
/// Values containing commas, quotes or newlines are quoted, with embedded
/// quotes doubled.
///
/// # Arguments
/// * `rows` - Rows as returned by `get_all_values`
///
/// # Returns
/// * `String` - CSV text, one line per row
pub fn to_csv(rows: &[Vec<String>]) -> String {
    let mut csv_content = String::new();

    for row in rows {
        for (c, value) in row.iter().enumerate() {
            if c > 0 {
                csv_content.push(',');
            }
            if value.contains(',') || value.contains('"') || value.contains('\n') {
                let escaped = value.replace('"', "\"\"");
                csv_content.push_str(&format!("\"{}\"", escaped));
            } else {
                csv_content.push_str(value);
            }
        }
        csv_content.push('\n');
    }

    csv_content
}

/// Convert sheet rows to an XLSX workbook with a single worksheet
///
/// Empty strings are left as blank cells.
///
/// # Returns
/// * `Result<Vec<u8>, BackupError>` - XLSX file content as bytes or an error
pub fn to_xlsx(rows: &[Vec<String>]) -> Result<Vec<u8>, BackupError> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(r as u32, c as u16, value)?;
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Name of a backup taken at `at`; later attempts within the same second get
/// a `_1`, `_2`, ... suffix
pub fn backup_filename(at: NaiveDateTime, attempt: u32) -> String {
    let stamp = at.format("%Y-%m-%d_%H-%M-%S");
    match attempt {
        0 => format!("backup_{}.xlsx", stamp),
        n => format!("backup_{}_{}.xlsx", stamp, n),
    }
}

/// Write `contents` under a backup name no other file in `dir` is using
fn write_new_backup(dir: &Path, at: NaiveDateTime, contents: &[u8]) -> std::io::Result<PathBuf> {
    for attempt in 0..MAX_SAME_SECOND_BACKUPS {
        let path = dir.join(backup_filename(at, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(contents)?;
                file.sync_all()?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("too many backups taken at {}", at),
    ))
}

/// Guard for download requests: only plain backup file names are served
pub fn is_backup_name(name: &str) -> bool {
    name.starts_with("backup_")
        && name.ends_with(".xlsx")
        && !name.contains(&['/', '\\'][..])
        && !name.contains("..")
}

/// Snapshot every row into `dir`, then clear the sheet and lay it out afresh
///
/// The export is written before anything is cleared; a failed export leaves
/// the sheet untouched. An existing backup is never replaced.
///
/// # Arguments
/// * `store` - The sheet to back up and reset
/// * `dir` - Backup directory, created when missing
///
/// # Returns
/// * `Result<PathBuf, BackupError>` - Path of the new workbook, or an error
///
/// # Errors
/// * Returns an error if the sheet cannot be read or the workbook cannot be written
/// * Returns an error if the sheet cannot be re-initialized after the export
pub async fn backup_and_reset(store: &dyn SheetStore, dir: &Path) -> Result<PathBuf, BackupError> {
    let all_values = store.get_all_values().await?;

    let workbook = to_xlsx(&all_values)?;
    create_dir_all(dir)?;
    let path = write_new_backup(dir, Local::now().naive_local(), &workbook)?;
    info!("backup of {} rows saved to {}", all_values.len(), path.display());

    initialize_sheet(store).await?;
    Ok(path)
}

/// Backup file metadata
#[derive(Debug, Serialize)]
pub struct BackupFile {
    pub name: String,
    pub size: u64,
    pub modified: String,
}

/// List the backups in `dir`, newest first
///
/// Files that do not look like backups are skipped.
///
/// # Arguments
/// * `dir` - Backup directory; a missing directory yields an empty list
///
/// # Returns
/// * `Vec<BackupFile>` - Name, size and modification time of each backup
pub fn list_backups(dir: &Path) -> Vec<BackupFile> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !is_backup_name(name) {
                continue;
            }
            let metadata = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            let modified: chrono::DateTime<Local> =
                metadata.modified().unwrap_or(SystemTime::now()).into();

            files.push(BackupFile {
                name: name.to_string(),
                size: metadata.len(),
                modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            });
        }
    }

    // Names embed the timestamp, so they sort chronologically
    files.sort_by(|a, b| b.name.cmp(&a.name));
    files
}
