//! Summary file persistence.
//!
//! Writes are atomic: the JSON goes to `{path}.tmp` and is renamed into
//! place, so a dashboard reading the file never sees a partial document.

use dvolwatch_core::SummaryRecord;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> PersistError {
    let path = path.to_path_buf();
    move |source| PersistError::Io {
        action,
        path,
        source,
    }
}

/// Temp path used while writing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Serialize `record` as pretty JSON and atomically replace `path`.
pub fn write_summary(path: &Path, record: &SummaryRecord) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(record)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error("failed to create dir", parent))?;
    }

    let tmp_path = temp_path(path);
    fs::write(&tmp_path, json).map_err(io_error("failed to write", &tmp_path))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("atomic rename failed for", path)(e)
    })
}

/// Read a previously written summary file.
pub fn read_summary(path: &Path) -> Result<SummaryRecord, PersistError> {
    let text = fs::read_to_string(path).map_err(io_error("failed to read", path))?;
    Ok(serde_json::from_str(&text)?)
}
