// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod logs;
pub mod probe;
pub mod registry;
pub mod types;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::commands::{add_command, list_commands, print_config};
use crate::config::{SupervisorConfig, bootstrap, load_config, resolve_home};
use crate::engine::Reconciler;
use crate::exec::{Launcher, ShellSpawner};
use crate::logs::LogPaths;
use crate::probe::{ProcessTableProber, PsProcessTable};
use crate::registry::Registry;

/// High-level entry point used by `main.rs`.
///
/// Resolves the home and configuration, then runs the requested command.
pub async fn run(args: CliArgs) -> Result<()> {
    let home = resolve_home(args.home.as_deref())?;
    let cfg = load_config(&home, args.config.as_deref())
        .with_context(|| format!("loading configuration for {home:?}"))?;
    debug!(?cfg, "effective configuration");

    match args.command {
        Command::Daemon => run_daemon(cfg).await,
        Command::Add { no_start, command } => {
            bootstrap(&cfg)?;
            let spawner = build_spawner(&cfg);
            let launcher: Option<&dyn Launcher> = if no_start { None } else { Some(&spawner) };
            add_command(
                &Registry::new(&cfg.registry_path),
                launcher,
                &command.join(" "),
                &mut io::stdout(),
            )?;
            Ok(())
        }
        Command::List => {
            list_commands(
                &Registry::new(&cfg.registry_path),
                &build_prober(&cfg),
                &LogPaths::new(&cfg.log_dir),
                &mut io::stdout(),
            )
            .await
        }
        Command::Config => print_config(&cfg, &mut io::stdout()),
    }
}

/// Production prober: `ps` snapshot plus the configured matcher.
pub fn build_prober(cfg: &SupervisorConfig) -> ProcessTableProber<PsProcessTable> {
    ProcessTableProber::new(PsProcessTable::new(), cfg.matcher.build())
}

/// Production launcher writing attempt logs into the configured directory.
pub fn build_spawner(cfg: &SupervisorConfig) -> ShellSpawner {
    ShellSpawner::new(cfg.shell.clone(), LogPaths::new(&cfg.log_dir))
}

/// Run the reconciliation loop until SIGTERM or Ctrl-C.
async fn run_daemon(cfg: SupervisorConfig) -> Result<()> {
    bootstrap(&cfg)?;

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let reconciler = Reconciler::new(
        Registry::new(&cfg.registry_path),
        Arc::new(build_spawner(&cfg)),
        Arc::new(build_prober(&cfg)),
        cfg.policy,
        cfg.interval,
    );

    reconciler.run(shutdown).await?;
    Ok(())
}

/// Ctrl-C or SIGTERM (service stop) → cancel the reconciler.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to listen for SIGTERM; only Ctrl-C will stop the daemon");
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                        return;
                    }
                    shutdown.cancel();
                    return;
                }
            };

            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                    }
                }
                _ = terminate.recv() => {}
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
        }

        info!("shutdown signal received");
        shutdown.cancel();
    });
}
