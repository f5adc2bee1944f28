// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{RawConfigFile, SupervisorConfig};
use crate::engine::RetryPolicy;
use crate::errors::{RespawnError, Result};

impl SupervisorConfig {
    /// Validate a raw config and resolve its paths against `home`.
    pub fn resolve(raw: RawConfigFile, home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();

        let interval = parse_field("reconcile.interval", &raw.reconcile.interval)?;
        let verify_delay = parse_field("reconcile.verify_delay", &raw.reconcile.verify_delay)?;
        let launch_backoff =
            parse_field("reconcile.launch_backoff", &raw.reconcile.launch_backoff)?;

        ensure_non_zero("reconcile.interval", interval)?;
        ensure_non_zero("reconcile.verify_delay", verify_delay)?;
        ensure_non_zero("reconcile.launch_backoff", launch_backoff)?;

        if raw.reconcile.max_launch_attempts == Some(0) {
            return Err(RespawnError::ConfigError(
                "reconcile.max_launch_attempts must be >= 1 (omit it to retry forever)"
                    .to_string(),
            ));
        }

        let shell = raw.spawn.shell.trim().to_string();
        if shell.is_empty() {
            return Err(RespawnError::ConfigError(
                "spawn.shell must not be empty".to_string(),
            ));
        }

        let registry_path = match raw.paths.registry {
            Some(p) => resolve_path(&home, &p),
            None => home.join(SupervisorConfig::REGISTRY_FILE),
        };
        let log_dir = match raw.paths.logs {
            Some(p) => resolve_path(&home, &p),
            None => home.join(SupervisorConfig::LOG_DIR),
        };

        Ok(SupervisorConfig {
            home,
            registry_path,
            log_dir,
            interval,
            policy: RetryPolicy {
                launch_backoff,
                verify_delay,
                max_launch_attempts: raw.reconcile.max_launch_attempts,
            },
            matcher: raw.probe.matcher,
            shell,
        })
    }
}

fn parse_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| RespawnError::ConfigError(format!("{field}: {e}")))
}

fn ensure_non_zero(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(RespawnError::ConfigError(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

/// `~/x` expands to the user's home directory, relative paths hang off the
/// supervisor home, absolute paths are kept.
fn resolve_path(home: &Path, path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(user_home) = dirs::home_dir() {
            return user_home.join(rest);
        }
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
