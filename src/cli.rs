// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `respawn`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "respawn",
    version,
    about = "Keep a handful of shell commands running, restarting them when they die.",
    long_about = None
)]
pub struct CliArgs {
    /// Supervisor home holding the registry, logs and `respawn.toml`.
    ///
    /// Default: `RESPAWN_HOME`, else `~/.respawn`.
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `respawn.toml` inside the home, if it exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RESPAWN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the reconciliation loop in the foreground until SIGTERM/Ctrl-C.
    ///
    /// This is what a service manager (systemd, launchd, ...) should run.
    Daemon,

    /// Register a command and start it once right away.
    Add {
        /// Do not launch the command now; the daemon will on its next pass.
        #[arg(long)]
        no_start: bool,

        /// The command line, e.g. `respawn add python3 job.py`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List managed commands with their state and most recent log file.
    List,

    /// Print the effective configuration without running anything.
    Config,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
