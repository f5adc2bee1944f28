// src/registry/entry.rs

use std::fmt;
use std::path::Path;

use crate::errors::{RespawnError, Result};

/// A shell command the supervisor is responsible for keeping alive.
///
/// `name` is only a label (log-file prefix, log field); two entries may share
/// it and are still managed independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedCommand {
    pub name: String,
    pub command_line: String,
}

impl ManagedCommand {
    /// Build an entry from the command text a user registers, deriving the
    /// name from the base name of its first token.
    ///
    /// `"/usr/bin/python3 job.py"` becomes `python3`.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let command_line = command_line.trim();
        if command_line.is_empty() {
            return Err(RespawnError::InvalidCommand(
                "command line is empty".to_string(),
            ));
        }
        if command_line.contains(['\n', '\r']) {
            return Err(RespawnError::InvalidCommand(format!(
                "command line must be a single line: {command_line:?}"
            )));
        }

        Ok(Self {
            name: derive_name(command_line),
            command_line: command_line.to_string(),
        })
    }

    /// Parse one line of the backing store.
    ///
    /// The first whitespace-delimited token is the name and the rest is the
    /// command line. A line holding a single token is used whole as the
    /// command line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let command_line = if rest.is_empty() { line } else { rest };

        Some(Self {
            name: name.to_string(),
            command_line: command_line.to_string(),
        })
    }

    /// Encode as a store line, including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.name, self.command_line)
    }
}

impl fmt::Display for ManagedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.command_line)
    }
}

fn derive_name(command_line: &str) -> String {
    let first = command_line
        .split_whitespace()
        .next()
        .unwrap_or(command_line);

    Path::new(first)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(first)
        .to_string()
}
