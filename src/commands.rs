// src/commands.rs

//! The one-shot CLI commands (`add`, `list`, `config`).
//!
//! Each takes the components it needs plus an output writer; `lib::run`
//! wires in the production ones and stdout.

use std::io::Write;

use anyhow::Result;
use tracing::warn;

use crate::config::SupervisorConfig;
use crate::exec::Launcher;
use crate::fs::FileSystem;
use crate::logs::LogPaths;
use crate::probe::LivenessProber;
use crate::registry::{ManagedCommand, Registry};

/// Register `command_line`, then launch it once through `launcher` if one is
/// given.
///
/// A failed launch is reported on `out` but the entry stays registered; the
/// daemon keeps retrying it.
pub fn add_command<F, W>(
    registry: &Registry<F>,
    launcher: Option<&dyn Launcher>,
    command_line: &str,
    out: &mut W,
) -> Result<ManagedCommand>
where
    F: FileSystem,
    W: Write,
{
    let cmd = ManagedCommand::from_command_line(command_line)?;
    registry.append(&cmd)?;
    writeln!(out, "Registered {}: {}", cmd.name, cmd.command_line)?;

    if let Some(launcher) = launcher {
        match launcher.launch(&cmd) {
            Ok(log_path) => writeln!(out, "Started {} (log: {})", cmd.name, log_path.display())?,
            Err(e) => {
                warn!(name = %cmd.name, error = %e, "initial launch failed");
                writeln!(out, "Could not start {} now: {e}", cmd.name)?;
            }
        }
    }

    Ok(cmd)
}

/// Print every entry with its state and latest log.
pub async fn list_commands<F, G, P, W>(
    registry: &Registry<F>,
    prober: &P,
    logs: &LogPaths<G>,
    out: &mut W,
) -> Result<()>
where
    F: FileSystem,
    G: FileSystem,
    P: LivenessProber + ?Sized,
    W: Write,
{
    let entries = registry.load()?;
    if entries.is_empty() {
        writeln!(out, "No managed commands.")?;
        return Ok(());
    }

    for cmd in entries {
        let state = if prober.is_alive(&cmd.command_line).await {
            "running"
        } else {
            "stopped"
        };
        let log = logs
            .latest_attempt_path(&cmd.name)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no logs yet".to_string());

        writeln!(out, "[{state}] {}: {}", cmd.name, cmd.command_line)?;
        writeln!(out, "    log: {log}")?;
    }

    Ok(())
}

/// Config dump: resolved paths, timings and strategy.
pub fn print_config<W: Write>(cfg: &SupervisorConfig, out: &mut W) -> Result<()> {
    writeln!(out, "respawn configuration")?;
    writeln!(out, "  home = {}", cfg.home.display())?;
    writeln!(out, "  registry = {}", cfg.registry_path.display())?;
    writeln!(out, "  logs = {}", cfg.log_dir.display())?;
    writeln!(out, "  reconcile.interval = {:?}", cfg.interval)?;
    writeln!(out, "  reconcile.verify_delay = {:?}", cfg.policy.verify_delay)?;
    writeln!(out, "  reconcile.launch_backoff = {:?}", cfg.policy.launch_backoff)?;
    match cfg.policy.max_launch_attempts {
        Some(max) => writeln!(out, "  reconcile.max_launch_attempts = {max}")?,
        None => writeln!(out, "  reconcile.max_launch_attempts = unlimited")?,
    }
    writeln!(out, "  probe.matcher = {}", cfg.matcher)?;
    writeln!(out, "  spawn.shell = {}", cfg.shell)?;
    Ok(())
}
