//! CSV file trade ledger adapter.

use crate::domain::error::BridgeError;
use crate::domain::ledger::LedgerEntry;
use crate::ports::ledger_port::LedgerPort;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends one row per entry to a CSV file, flushing after every row.
pub struct CsvLedger {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvLedger {
    /// Open `path` for appending. The header row is written only when the
    /// file is new or empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BridgeError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerPort for CsvLedger {
    fn append(&self, entry: &LedgerEntry) -> Result<(), BridgeError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BridgeError::Io(std::io::Error::other("ledger lock poisoned")))?;
        writer.serialize(entry).map_err(|e| {
            BridgeError::Io(std::io::Error::other(format!(
                "failed to write ledger row to {}: {}",
                self.path.display(),
                e
            )))
        })?;
        writer.flush()?;
        Ok(())
    }
}
