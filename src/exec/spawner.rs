// src/exec/spawner.rs

//! Detached shell launcher.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;

use chrono::Local;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{RespawnError, Result};
use crate::exec::backend::Launcher;
use crate::logs::LogPaths;
use crate::registry::ManagedCommand;

/// Launches managed commands as `<shell> -c <command_line>`.
///
/// - stdout and stderr are appended to a new attempt log from [`LogPaths`].
/// - stdin is `/dev/null`.
/// - On unix the child gets its own process group, so a Ctrl-C or SIGTERM
///   aimed at the supervisor does not reach it.
/// - No handle is kept; Tokio reaps the child when it exits.
#[derive(Debug, Clone)]
pub struct ShellSpawner {
    shell: String,
    logs: LogPaths,
}

impl ShellSpawner {
    pub fn new(shell: impl Into<String>, logs: LogPaths) -> Self {
        Self {
            shell: shell.into(),
            logs,
        }
    }

    pub fn logs(&self) -> &LogPaths {
        &self.logs
    }

    fn launch_failed(cmd: &ManagedCommand, reason: String) -> RespawnError {
        RespawnError::LaunchFailed {
            name: cmd.name.clone(),
            reason,
        }
    }
}

impl Launcher for ShellSpawner {
    fn launch(&self, cmd: &ManagedCommand) -> Result<PathBuf> {
        let log_path = self
            .logs
            .new_attempt_path(&cmd.name, Local::now().naive_local());

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| {
                Self::launch_failed(cmd, format!("opening log file {log_path:?}: {e}"))
            })?;
        let stderr = stdout.try_clone().map_err(|e| {
            Self::launch_failed(cmd, format!("duplicating log handle {log_path:?}: {e}"))
        })?;

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&cmd.command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(false);

        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| {
            Self::launch_failed(cmd, format!("starting {} -c: {e}", self.shell))
        })?;

        info!(
            name = %cmd.name,
            pid = child.id(),
            log = ?log_path,
            "launched managed command"
        );
        debug!(name = %cmd.name, command = %cmd.command_line, shell = %self.shell, "launch details");

        // Dropping the handle detaches the child.
        drop(child);
        Ok(log_path)
    }
}
