//! JSON file store
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/stocks.json           every stock
//! <root>/prices/<SYMBOL>.json  daily prices of one stock
//! <root>/events/<SYMBOL>.json  events of one stock
//! ```
//!
//! Every write reloads the affected document, mutates it in memory and
//! replaces the file atomically. A process-local guard serialises those
//! read-modify-write sequences; writers in other processes are not
//! coordinated.

mod event;
mod stock;

pub use event::FileEventStore;

use crate::error::{AppError, Result};
use crate::models::validate_symbol;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const STOCKS_FILE: &str = "stocks.json";
const PRICES_DIR: &str = "prices";
pub(crate) const EVENTS_DIR: &str = "events";

/// Stocks and prices stored as JSON documents
pub struct FileStore {
    root: PathBuf,
    write_guard: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(PRICES_DIR))?;
        tracing::info!("File store opened at {}", root.display());
        Ok(Self {
            root,
            write_guard: Mutex::new(()),
        })
    }

    fn stocks_path(&self) -> PathBuf {
        self.root.join(STOCKS_FILE)
    }

    fn prices_path(&self, symbol: &str) -> Result<PathBuf> {
        partition_path(&self.root.join(PRICES_DIR), symbol)
    }
}

/// `<dir>/<SYMBOL>.json`; the symbol is checked so it cannot escape `dir`
pub(crate) fn partition_path(dir: &Path, symbol: &str) -> Result<PathBuf> {
    validate_symbol(symbol)?;
    Ok(dir.join(format!("{}.json", symbol)))
}

/// Load a JSON array; a missing file is an empty collection
pub(crate) fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AppError::StoreUnavailable(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!("Corrupt document {}: {}", path.display(), e);
        AppError::StoreUnavailable(format!("corrupt document {}: {}", path.display(), e))
    })
}

/// Replace `path` with `records` via a synced temp file in the same directory
pub(crate) fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AppError::Internal(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), records)?;
    tmp.as_file_mut().write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    tracing::debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Every `*.json` partition in `dir`, sorted by file name
pub(crate) fn list_partitions(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
