// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, SupervisorConfig};
use crate::errors::{RespawnError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// Environment variable overriding the supervisor home.
pub const HOME_ENV: &str = "RESPAWN_HOME";

/// Pick the supervisor home.
///
/// Priority: explicit `--home`, then `RESPAWN_HOME`, then `~/.respawn`.
pub fn resolve_home(cli_home: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = cli_home {
        return Ok(home.to_path_buf());
    }
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".respawn"))
        .ok_or_else(|| {
            RespawnError::ConfigError(format!(
                "cannot determine home directory; pass --home or set {HOME_ENV}"
            ))
        })
}

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; values are checked by
/// [`SupervisorConfig::resolve`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load and validate the configuration for `home`.
///
/// - An explicit `config_path` must exist.
/// - Otherwise `<home>/respawn.toml` is used when present, and built-in
///   defaults when it is not.
pub fn load_config(home: &Path, config_path: Option<&Path>) -> Result<SupervisorConfig> {
    let raw = match config_path {
        Some(path) => {
            debug!(path = ?path, "loading config file");
            load_from_path(path)?
        }
        None => {
            let default_path = home.join(SupervisorConfig::CONFIG_FILE);
            if default_path.is_file() {
                debug!(path = ?default_path, "loading config file");
                load_from_path(&default_path)?
            } else {
                debug!(path = ?default_path, "no config file; using defaults");
                RawConfigFile::default()
            }
        }
    };

    SupervisorConfig::resolve(raw, home)
}

/// Create the on-disk locations the reconciler needs: the home, the
/// registry's parent directory and the log directory.
///
/// Failure here is fatal; the supervisor cannot run without them.
pub fn bootstrap(cfg: &SupervisorConfig) -> Result<()> {
    bootstrap_with(&RealFileSystem, cfg)
}

/// [`bootstrap`] on an arbitrary [`FileSystem`].
pub fn bootstrap_with<F: FileSystem>(fs: &F, cfg: &SupervisorConfig) -> Result<()> {
    let registry_dir = cfg
        .registry_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty());

    for dir in [Some(cfg.home.as_path()), registry_dir, Some(cfg.log_dir.as_path())]
        .into_iter()
        .flatten()
    {
        fs.create_dir_all(dir).map_err(|source| RespawnError::Bootstrap {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    debug!(home = ?cfg.home, logs = ?cfg.log_dir, "supervisor directories ready");
    Ok(())
}
