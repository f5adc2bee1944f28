use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use respawn::errors::{RespawnError, Result};
use respawn::exec::Launcher;
use respawn::registry::ManagedCommand;

/// A fake launcher that:
/// - records every command it was asked to launch
/// - fails the scripted number of launches, then succeeds (or, with
///   `always_failing`, fails) forever.
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    fail_forever: bool,
    script: Mutex<VecDeque<String>>,
    launched: Mutex<Vec<ManagedCommand>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` launches, then succeed.
    pub fn failing_first(n: usize) -> Self {
        let launcher = Self::new();
        for _ in 0..n {
            launcher.push_failure("scripted failure");
        }
        launcher
    }

    /// Fail every launch.
    pub fn always_failing() -> Self {
        Self {
            fail_forever: true,
            ..Self::default()
        }
    }

    /// Queue one failing launch.
    pub fn push_failure(&self, reason: &str) {
        self.script.lock().unwrap().push_back(reason.to_string());
    }

    /// Commands launched so far, in order.
    pub fn launched(&self) -> Vec<ManagedCommand> {
        self.launched.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, cmd: &ManagedCommand) -> Result<PathBuf> {
        let attempt = {
            let mut launched = self.launched.lock().unwrap();
            launched.push(cmd.clone());
            launched.len()
        };

        let failure = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fail_forever.then(|| "scripted failure".to_string()));

        match failure {
            Some(reason) => Err(RespawnError::LaunchFailed {
                name: cmd.name.clone(),
                reason,
            }),
            None => Ok(PathBuf::from(format!("/fake/logs/{}-{attempt}.log", cmd.name))),
        }
    }
}
