// src/engine/mod.rs

//! Reconciliation engine for respawn.
//!
//! This module ties together:
//! - the registry (what should be running)
//! - the liveness prober (what is running)
//! - the launcher (how to start what is missing)
//!
//! The per-entry spawn-verify-retry decisions live in the pure state machine
//! in [`cycle`]; the async/IO shell that loads the registry on a fixed
//! cadence and drives one cycle per dead entry is [`runtime`].

use std::time::Duration;

use crate::registry::ManagedCommand;

/// Timing and cap of one entry's spawn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a launch that could not start the process.
    pub launch_backoff: Duration,
    /// Wait between a successful launch and the liveness check.
    pub verify_delay: Duration,
    /// Give up the cycle after this many launches. `None` retries forever.
    pub max_launch_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            launch_backoff: Duration::from_secs(5),
            verify_delay: Duration::from_secs(2),
            max_launch_attempts: None,
        }
    }
}

/// How a spawn cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The command was seen alive after a launch.
    Alive,
    /// `max_launch_attempts` was reached.
    GaveUp,
    /// The reconciler was stopped while the cycle was waiting.
    Cancelled,
}

/// Summary of one finished spawn cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub command: ManagedCommand,
    pub outcome: CycleOutcome,
    /// Launch attempts, successful or not.
    pub launches: u32,
    pub launch_failures: u32,
    /// Launches whose process was gone by the liveness check.
    pub immediate_exits: u32,
    /// Backoff waits entered after launch failures.
    pub backoffs: u32,
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Entries read from the registry.
    pub loaded: usize,
    /// In-flight cycles stopped because their entry left the registry.
    pub removed: usize,
    /// Entries the prober reported alive.
    pub alive: usize,
    /// Entries skipped because their previous cycle is still running.
    pub in_flight: usize,
    /// Entries a new spawn cycle was started for.
    pub spawned: usize,
}

pub mod cycle;
pub mod runtime;

pub use cycle::{CycleAction, CycleEvent, SpawnCycle};
pub use runtime::{Reconciler, drive_cycle};
