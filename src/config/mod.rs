// src/config/mod.rs

//! Configuration loading and validation for respawn.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Locate the supervisor home and load the config file (`loader.rs`).
//! - Validate values and resolve them into a [`SupervisorConfig`]
//!   (`validate.rs`).
//!
//! Components never read the environment themselves; everything they need
//! arrives through `SupervisorConfig`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{bootstrap, bootstrap_with, load_config, load_from_path, resolve_home};
pub use model::{
    PathsSection, ProbeSection, RawConfigFile, ReconcileSection, SpawnSection, SupervisorConfig,
};
pub use validate::parse_duration;
