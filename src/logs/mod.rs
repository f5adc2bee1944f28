// src/logs/mod.rs

//! Per-attempt log file naming.
//!
//! Every launch writes to `<log_dir>/<name>-<YYYY-MM-DD_HH-MM-SS>.log`, with
//! path separators in `name` replaced by `_`. Files are never reused across
//! seconds and never cleaned up here.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;
use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};

/// `chrono` format of the timestamp part of an attempt log name.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Resolves attempt log paths inside one log directory.
#[derive(Debug, Clone)]
pub struct LogPaths<F: FileSystem = RealFileSystem> {
    fs: F,
    dir: PathBuf,
}

impl LogPaths<RealFileSystem> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_fs(RealFileSystem, dir)
    }
}

impl<F: FileSystem> LogPaths<F> {
    pub fn with_fs(fs: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for an attempt of `name` started at `at` (local wall-clock time).
    ///
    /// Two attempts of the same name within one second share a path; the
    /// spawn cycle never relaunches that quickly.
    pub fn new_attempt_path(&self, name: &str, at: NaiveDateTime) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.log",
            file_prefix(name),
            at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Most recently modified attempt log of `name`, if any.
    ///
    /// Read errors (missing directory, unreadable entries) are treated as
    /// "no log".
    pub fn latest_attempt_path(&self, name: &str) -> Option<PathBuf> {
        let matcher = match attempt_matcher(name) {
            Some(m) => m,
            None => {
                debug!(name, "could not build log glob for name");
                return None;
            }
        };

        let entries = match self.fs.read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = ?self.dir, error = %e, "cannot list log directory");
                return None;
            }
        };

        entries
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|file_name| matcher.is_match(Path::new(file_name)))
            })
            .filter_map(|path| {
                let modified: SystemTime = self.fs.modified(&path).ok()?;
                Some((modified, path))
            })
            .max_by(|(a_time, a_path), (b_time, b_path)| {
                a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
            })
            .map(|(_, path)| path)
    }
}

/// Log file prefix for `name`. Path separators become `_` so every attempt
/// log lands directly in the log directory.
pub fn file_prefix(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// Glob for `<name>-YYYY-MM-DD_*.log`.
///
/// Requiring the date shape keeps `api` from picking up `api-gateway-...`
/// logs.
fn attempt_matcher(name: &str) -> Option<GlobMatcher> {
    let pattern = format!(
        "{}-[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]_*.log",
        globset::escape(&file_prefix(name))
    );
    Glob::new(&pattern).ok().map(|g| g.compile_matcher())
}
