// src/probe/process_table.rs

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;

use crate::errors::{RespawnError, Result};

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Full invocation (program and arguments joined by spaces).
    pub args: String,
}

/// Source of process table snapshots.
pub trait ProcessTable: Send + Sync {
    fn snapshot(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ProcessEntry>>> + Send + '_>>;
}

/// Process table read through `ps -eo pid=,args=`.
#[derive(Debug, Clone)]
pub struct PsProcessTable {
    program: String,
}

impl PsProcessTable {
    pub fn new() -> Self {
        Self {
            program: "ps".to_string(),
        }
    }

    /// Use a different `ps` binary (absolute path or name on `PATH`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PsProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for PsProcessTable {
    fn snapshot(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ProcessEntry>>> + Send + '_>> {
        Box::pin(async move {
            let output = Command::new(&self.program)
                .args(["-eo", "pid=,args="])
                .stdin(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|e| {
                    RespawnError::ProbeError(format!("running {}: {e}", self.program))
                })?;

            if !output.status.success() {
                return Err(RespawnError::ProbeError(format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout)))
        })
    }
}

/// Parse `ps -eo pid=,args=` output: a right-aligned pid, whitespace, then
/// the invocation. Lines without a numeric pid are skipped.
pub fn parse_ps_output(output: &str) -> Vec<ProcessEntry> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, args) = match line.split_once(char::is_whitespace) {
                Some((pid, args)) => (pid, args.trim()),
                None => (line, ""),
            };
            let pid = pid.parse::<u32>().ok()?;
            Some(ProcessEntry {
                pid,
                args: args.to_string(),
            })
        })
        .collect()
}
