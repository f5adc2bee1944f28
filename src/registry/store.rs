// src/registry/store.rs

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{RespawnError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::entry::ManagedCommand;

/// Flat, append-only text store of managed commands.
///
/// Nothing is cached: every [`Registry::load`] re-reads the file, so edits
/// made by other processes show up on the next reconciliation pass.
#[derive(Debug, Clone)]
pub struct Registry<F: FileSystem = RealFileSystem> {
    fs: F,
    path: PathBuf,
}

impl Registry<RealFileSystem> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(RealFileSystem, path)
    }
}

impl<F: FileSystem> Registry<F> {
    pub fn with_fs(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry in store order.
    ///
    /// A store that does not exist yet is an empty registry. Any other read
    /// failure is reported as [`RespawnError::StorageUnavailable`] rather than
    /// returning a partial list.
    pub fn load(&self) -> Result<Vec<ManagedCommand>> {
        let contents = match self.fs.read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "registry store does not exist yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(RespawnError::StorageUnavailable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let entries: Vec<ManagedCommand> = contents
            .lines()
            .filter_map(ManagedCommand::parse_line)
            .collect();

        debug!(path = ?self.path, count = entries.len(), "registry loaded");
        Ok(entries)
    }

    /// Append one entry, creating the store if it is absent.
    ///
    /// Only entries that [`Registry::load`] reads back unchanged are
    /// accepted: a non-empty name without whitespace, and a non-empty,
    /// single-line command line without surrounding whitespace.
    pub fn append(&self, cmd: &ManagedCommand) -> Result<()> {
        if cmd.name.is_empty()
            || cmd.name.contains(char::is_whitespace)
            || cmd.command_line.is_empty()
            || cmd.command_line.trim() != cmd.command_line
            || cmd.command_line.contains(['\n', '\r'])
        {
            return Err(RespawnError::InvalidCommand(format!(
                "entry cannot be stored on a single line: {cmd}"
            )));
        }

        self.fs
            .append(&self.path, cmd.to_line().as_bytes())
            .map_err(|source| RespawnError::StorageUnavailable {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = ?self.path, name = %cmd.name, "registry entry appended");
        Ok(())
    }
}
