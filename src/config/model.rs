// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::RetryPolicy;
use crate::types::MatcherKind;

/// Configuration as read from `respawn.toml`.
///
/// ```toml
/// [paths]
/// registry = "registry.txt"   # relative paths are resolved against the home
/// logs = "logs"
///
/// [reconcile]
/// interval = "30s"
/// verify_delay = "2s"
/// launch_backoff = "5s"
/// # max_launch_attempts = 10  # unset: retry forever
///
/// [probe]
/// matcher = "substring"       # or "regex", "exact"
///
/// [spawn]
/// shell = "sh"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub reconcile: ReconcileSection,

    #[serde(default)]
    pub probe: ProbeSection,

    #[serde(default)]
    pub spawn: SpawnSection,
}

/// `[paths]` section. Unset paths live under the supervisor home.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    pub registry: Option<PathBuf>,
    pub logs: Option<PathBuf>,
}

/// `[reconcile]` section. Durations use `ms`, `s`, `m` or `h` suffixes.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_verify_delay")]
    pub verify_delay: String,

    #[serde(default = "default_launch_backoff")]
    pub launch_backoff: String,

    #[serde(default)]
    pub max_launch_attempts: Option<u32>,
}

fn default_interval() -> String {
    "30s".to_string()
}

fn default_verify_delay() -> String {
    "2s".to_string()
}

fn default_launch_backoff() -> String {
    "5s".to_string()
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            verify_delay: default_verify_delay(),
            launch_backoff: default_launch_backoff(),
            max_launch_attempts: None,
        }
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeSection {
    #[serde(default)]
    pub matcher: MatcherKind,
}

/// `[spawn]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnSection {
    /// Shell used as `<shell> -c <command line>`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for SpawnSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
        }
    }
}

/// Validated configuration handed to every component at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Supervisor home (default `~/.respawn`).
    pub home: PathBuf,
    pub registry_path: PathBuf,
    pub log_dir: PathBuf,
    /// Time between reconciliation passes.
    pub interval: Duration,
    pub policy: RetryPolicy,
    pub matcher: MatcherKind,
    pub shell: String,
}

impl SupervisorConfig {
    /// Default file name of the registry inside the home.
    pub const REGISTRY_FILE: &'static str = "registry.txt";
    /// Default log directory name inside the home.
    pub const LOG_DIR: &'static str = "logs";
    /// Config file looked up inside the home when none is given.
    pub const CONFIG_FILE: &'static str = "respawn.toml";
}
