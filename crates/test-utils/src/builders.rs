#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use respawn::config::{RawConfigFile, SupervisorConfig};
use respawn::engine::RetryPolicy;
use respawn::types::MatcherKind;
use tempfile::TempDir;

/// Retry policy with millisecond waits so cycle tests finish quickly.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        launch_backoff: Duration::from_millis(20),
        verify_delay: Duration::from_millis(10),
        max_launch_attempts: None,
    }
}

/// Builder for `SupervisorConfig` rooted in a fresh temporary home.
///
/// The `TempDir` is returned alongside the config from [`build`] and must be
/// kept alive for as long as the paths are used.
///
/// [`build`]: SupervisorConfigBuilder::build
pub struct SupervisorConfigBuilder {
    raw: RawConfigFile,
}

impl SupervisorConfigBuilder {
    pub fn new() -> Self {
        let mut raw = RawConfigFile::default();
        raw.reconcile.interval = "50ms".to_string();
        raw.reconcile.verify_delay = "10ms".to_string();
        raw.reconcile.launch_backoff = "20ms".to_string();
        Self { raw }
    }

    pub fn launch_backoff(mut self, value: &str) -> Self {
        self.raw.reconcile.launch_backoff = value.to_string();
        self
    }

    pub fn max_launch_attempts(mut self, max: u32) -> Self {
        self.raw.reconcile.max_launch_attempts = Some(max);
        self
    }

    pub fn matcher(mut self, matcher: MatcherKind) -> Self {
        self.raw.probe.matcher = matcher;
        self
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.raw.spawn.shell = shell.to_string();
        self
    }

    pub fn build(self) -> (TempDir, SupervisorConfig) {
        let home = TempDir::new().expect("Failed to create temp home");
        let cfg = SupervisorConfig::resolve(self.raw, home.path())
            .expect("Failed to build valid config from builder");
        fs::create_dir_all(&cfg.log_dir).expect("Failed to create log dir");
        (home, cfg)
    }
}

impl Default for SupervisorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a registry store with one line per entry.
pub fn write_registry(path: impl AsRef<Path>, lines: &[&str]) -> PathBuf {
    let path = path.as_ref().to_path_buf();
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents).expect("Failed to write registry");
    path
}

/// Files in `dir` whose names start with `<name>-` and end in `.log`.
pub fn attempt_logs(dir: impl AsRef<Path>, name: &str) -> Vec<PathBuf> {
    let prefix = format!("{name}-");
    let mut logs: Vec<PathBuf> = fs::read_dir(dir.as_ref())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".log"))
                })
                .collect()
        })
        .unwrap_or_default();
    logs.sort();
    logs
}
