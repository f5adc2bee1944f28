// src/exec/mod.rs

//! Process launch layer.
//!
//! - [`backend`] provides the `Launcher` trait the reconciler depends on.
//! - [`spawner`] is the production launcher: a detached `sh -c` child with
//!   its output appended to a fresh attempt log.

pub mod backend;
pub mod spawner;

pub use backend::Launcher;
pub use spawner::ShellSpawner;
