use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};

use respawn::config::{
    bootstrap, bootstrap_with, load_config, parse_duration, RawConfigFile, SupervisorConfig,
};
use respawn::engine::RetryPolicy;
use respawn::errors::RespawnError;
use respawn::fs::FileSystem;
use respawn::fs::mock::MockFileSystem;
use respawn::types::MatcherKind;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn missing_config_file_means_defaults() -> TestResult {
    let home = TempDir::new()?;
    let cfg = load_config(home.path(), None)?;

    assert_eq!(cfg.home, home.path());
    assert_eq!(cfg.registry_path, home.path().join("registry.txt"));
    assert_eq!(cfg.log_dir, home.path().join("logs"));
    assert_eq!(cfg.interval, Duration::from_secs(30));
    assert_eq!(cfg.policy, RetryPolicy::default());
    assert_eq!(cfg.policy.verify_delay, Duration::from_secs(2));
    assert_eq!(cfg.policy.launch_backoff, Duration::from_secs(5));
    assert_eq!(cfg.policy.max_launch_attempts, None);
    assert_eq!(cfg.matcher, MatcherKind::Substring);
    assert_eq!(cfg.shell, "sh");
    Ok(())
}

#[test]
fn config_file_in_home_is_picked_up() -> TestResult {
    let home = TempDir::new()?;
    std::fs::write(
        home.path().join("respawn.toml"),
        r#"
[paths]
registry = "state/registry.txt"
logs = "/var/log/respawn"

[reconcile]
interval = "1m"
verify_delay = "500ms"
launch_backoff = "10s"
max_launch_attempts = 7

[probe]
matcher = "regex"

[spawn]
shell = "/bin/bash"
"#,
    )?;

    let cfg = load_config(home.path(), None)?;

    assert_eq!(cfg.registry_path, home.path().join("state/registry.txt"));
    assert_eq!(cfg.log_dir, PathBuf::from("/var/log/respawn"));
    assert_eq!(cfg.interval, Duration::from_secs(60));
    assert_eq!(
        cfg.policy,
        RetryPolicy {
            launch_backoff: Duration::from_secs(10),
            verify_delay: Duration::from_millis(500),
            max_launch_attempts: Some(7),
        }
    );
    assert_eq!(cfg.matcher, MatcherKind::Regex);
    assert_eq!(cfg.shell, "/bin/bash");
    Ok(())
}

#[test]
fn explicit_config_path_must_exist() -> TestResult {
    let home = TempDir::new()?;
    let result = load_config(home.path(), Some(Path::new("/definitely/not/here.toml")));

    assert!(matches!(result, Err(RespawnError::IoError(_))));
    Ok(())
}

#[test]
fn unknown_matcher_is_a_toml_error() -> TestResult {
    let home = TempDir::new()?;
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[probe]
matcher = "fuzzy"
"#
    )?;

    let result = load_config(home.path(), Some(file.path()));
    assert!(matches!(result, Err(RespawnError::TomlError(_))));
    Ok(())
}

#[test]
fn zero_interval_is_rejected() {
    let mut raw = RawConfigFile::default();
    raw.reconcile.interval = "0s".to_string();

    match SupervisorConfig::resolve(raw, "/tmp/home") {
        Err(RespawnError::ConfigError(msg)) => assert!(msg.contains("reconcile.interval")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_max_launch_attempts_is_rejected() {
    let mut raw = RawConfigFile::default();
    raw.reconcile.max_launch_attempts = Some(0);

    assert!(matches!(
        SupervisorConfig::resolve(raw, "/tmp/home"),
        Err(RespawnError::ConfigError(_))
    ));
}

#[test]
fn zero_launch_backoff_is_rejected() {
    let mut raw = RawConfigFile::default();
    raw.reconcile.launch_backoff = "0ms".to_string();

    match SupervisorConfig::resolve(raw, "/tmp/home") {
        Err(RespawnError::ConfigError(msg)) => assert!(msg.contains("reconcile.launch_backoff")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn bad_duration_names_the_field() {
    let mut raw = RawConfigFile::default();
    raw.reconcile.launch_backoff = "5 fortnights".to_string();

    match SupervisorConfig::resolve(raw, "/tmp/home") {
        Err(RespawnError::ConfigError(msg)) => {
            assert!(msg.contains("reconcile.launch_backoff"));
            assert!(msg.contains("unsupported duration unit"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn parse_duration_accepts_supported_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));

    assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
    assert!(parse_duration(&format!("{}m", u64::MAX / 10)).is_err());
    assert_eq!(
        parse_duration(&format!("{}s", u64::MAX)),
        Ok(Duration::from_secs(u64::MAX))
    );

    assert!(parse_duration("").is_err());
    assert!(parse_duration("30").is_err());
    assert!(parse_duration("s").is_err());
}

#[test]
fn bootstrap_creates_home_and_log_dir() -> TestResult {
    let root = TempDir::new()?;
    let home = root.path().join("home");
    let cfg = SupervisorConfig::resolve(RawConfigFile::default(), &home)?;

    bootstrap(&cfg)?;

    assert!(home.is_dir());
    assert!(cfg.log_dir.is_dir());
    assert!(!cfg.registry_path.exists());
    Ok(())
}

#[test]
fn bootstrap_fails_when_a_file_blocks_the_home() -> TestResult {
    let blocker = NamedTempFile::new()?;
    let cfg = SupervisorConfig::resolve(RawConfigFile::default(), blocker.path())?;

    assert!(matches!(
        bootstrap(&cfg),
        Err(RespawnError::Bootstrap { .. })
    ));
    Ok(())
}

#[test]
fn bootstrap_goes_through_the_filesystem() -> TestResult {
    let fs = MockFileSystem::new();
    let cfg = SupervisorConfig::resolve(RawConfigFile::default(), "/srv/respawn")?;

    bootstrap_with(&fs, &cfg)?;

    assert!(fs.read_dir(Path::new("/srv/respawn"))?.contains(&cfg.log_dir));
    assert!(fs.read_dir(&cfg.log_dir)?.is_empty());
    Ok(())
}

#[test]
fn bootstrap_with_blocked_log_dir_names_the_path() -> TestResult {
    let fs = MockFileSystem::new();
    let cfg = SupervisorConfig::resolve(RawConfigFile::default(), "/srv/respawn")?;
    fs.add_file(&cfg.log_dir, "not a directory");

    match bootstrap_with(&fs, &cfg) {
        Err(RespawnError::Bootstrap { path, .. }) => assert_eq!(path, cfg.log_dir),
        other => panic!("Expected Bootstrap error, got: {:?}", other),
    }
    Ok(())
}
