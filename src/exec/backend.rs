// src/exec/backend.rs

//! Pluggable launcher abstraction.
//!
//! The reconciler talks to a `Launcher` instead of spawning processes
//! itself. Production code uses [`ShellSpawner`]; tests provide launchers
//! that record calls and script failures without touching the OS.
//!
//! [`ShellSpawner`]: super::spawner::ShellSpawner

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::Result;
use crate::registry::ManagedCommand;

/// Starts one attempt of a managed command.
///
/// A launch is fire-and-forget: it returns as soon as the process has been
/// started (or has failed to start) and yields the attempt's log path. It
/// must not wait for the child, and later misbehaviour of the child is not a
/// launch error.
pub trait Launcher: Send + Sync {
    fn launch(&self, cmd: &ManagedCommand) -> Result<PathBuf>;
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(&self, cmd: &ManagedCommand) -> Result<PathBuf> {
        (**self).launch(cmd)
    }
}
