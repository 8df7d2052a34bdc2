//! Port ledger - the on-disk list of agent ports.
//!
//! One port per line, in creation order. A fresh launch truncates the
//! file, an extend appends to it, a full teardown deletes it. Every
//! append is flushed before the next agent is created, so an interrupted
//! launch leaves a valid prefix.

use crate::error::SimError;
use liars_env::AgentId;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only writer over the ledger file.
#[derive(Debug)]
pub struct PortLedger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PortLedger {
    /// Creates (or truncates) the ledger at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| SimError::ledger("create", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Opens the ledger at `path` for appending, creating it if missing.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SimError::ledger("open", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Appends one port and flushes it to the file.
    pub fn append(&mut self, id: AgentId) -> Result<(), SimError> {
        writeln!(self.writer, "{}", id)
            .and_then(|_| self.writer.flush())
            .map_err(|e| SimError::ledger("write", &self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every port recorded in the ledger at `path`.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AgentId>, SimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SimError::ledger("open", path, e))?;

        let mut ids = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| SimError::ledger("read", path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let id = line.parse::<AgentId>().map_err(|e| {
                SimError::ledger(
                    "parse",
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("bad port {:?}: {}", line, e),
                    ),
                )
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Deletes the ledger at `path`.
    pub fn remove(path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        std::fs::remove_file(path).map_err(|e| SimError::ledger("delete", path, e))
    }
}
