// src/probe/mod.rs

//! Liveness probing.
//!
//! The reconciler never holds handles to the processes it launches. Whether a
//! managed command is running is decided here, from a fresh process table
//! snapshot, every time it is asked.
//!
//! - [`process_table`] takes the snapshot (`ps` in production).
//! - [`matcher`] holds the pluggable comparison strategies.

use std::future::Future;
use std::pin::Pin;

use tracing::{trace, warn};

pub mod matcher;
pub mod process_table;

pub use matcher::{ExactMatcher, LivenessMatcher, RegexMatcher, SubstringMatcher};
pub use process_table::{ProcessEntry, ProcessTable, PsProcessTable, parse_ps_output};

/// Answers "is a process running this command line right now?".
///
/// Implementations must not fail: when the answer cannot be determined they
/// report `false`, which makes the reconciler try a launch instead of leaving
/// a possibly dead command unattended.
pub trait LivenessProber: Send + Sync {
    fn is_alive<'a>(
        &'a self,
        command_line: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// Prober that scans a [`ProcessTable`] snapshot with a [`LivenessMatcher`].
#[derive(Debug)]
pub struct ProcessTableProber<T: ProcessTable> {
    table: T,
    matcher: Box<dyn LivenessMatcher>,
    own_pid: u32,
}

impl<T: ProcessTable> ProcessTableProber<T> {
    pub fn new(table: T, matcher: Box<dyn LivenessMatcher>) -> Self {
        Self {
            table,
            matcher,
            own_pid: std::process::id(),
        }
    }
}

impl<T: ProcessTable> LivenessProber for ProcessTableProber<T> {
    fn is_alive<'a>(
        &'a self,
        command_line: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            let processes = match self.table.snapshot().await {
                Ok(processes) => processes,
                Err(e) => {
                    warn!(
                        command = %command_line,
                        error = %e,
                        "process table query failed; treating command as not alive"
                    );
                    return false;
                }
            };

            let found = processes.iter().find(|p| {
                p.pid != self.own_pid && self.matcher.matches(command_line, &p.args)
            });

            match found {
                Some(p) => {
                    trace!(command = %command_line, pid = p.pid, "matching process found");
                    true
                }
                None => false,
            }
        })
    }
}
