// src/engine/cycle.rs

//! Pure spawn cycle state machine.
//!
//! A [`SpawnCycle`] consumes [`CycleEvent`]s and answers with the next
//! [`CycleAction`]. It performs no IO and never sleeps; the async driver in
//! [`super::runtime`] carries out the actions and reports back.
//!
//! ```text
//! Launch --failed--> Backoff --elapsed--> Launch
//! Launch --ok------> Verify  --dead-----> Launch
//!                    Verify  --alive----> Finish(Alive)
//! ```

use std::time::Duration;

use tracing::warn;

use crate::engine::{CycleOutcome, CycleReport, RetryPolicy};
use crate::registry::ManagedCommand;

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAction {
    /// Start one launch attempt.
    Launch,
    /// Sleep, then send [`CycleEvent::BackoffElapsed`].
    Backoff(Duration),
    /// Sleep, probe liveness, then send [`CycleEvent::Probed`].
    Verify(Duration),
    /// The cycle is over.
    Finish(CycleOutcome),
}

/// What happened since the last action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    LaunchSucceeded,
    LaunchFailed,
    BackoffElapsed,
    Probed { alive: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Launching,
    BackingOff,
    Verifying,
    Done(CycleOutcome),
}

/// Decision state of one entry's spawn cycle.
#[derive(Debug, Clone)]
pub struct SpawnCycle {
    policy: RetryPolicy,
    state: CycleState,
    launches: u32,
    launch_failures: u32,
    immediate_exits: u32,
    backoffs: u32,
}

impl SpawnCycle {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: CycleState::Launching,
            launches: 0,
            launch_failures: 0,
            immediate_exits: 0,
            backoffs: 0,
        }
    }

    /// First action of a fresh cycle.
    pub fn start(&mut self) -> CycleAction {
        self.state = CycleState::Launching;
        CycleAction::Launch
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, CycleState::Done(_))
    }

    /// Feed one event and get the next action.
    ///
    /// An event that does not fit the current state is logged and ignored;
    /// the pending action is returned again.
    pub fn step(&mut self, event: CycleEvent) -> CycleAction {
        match (self.state, event) {
            (CycleState::Launching, CycleEvent::LaunchFailed) => {
                self.launches += 1;
                self.launch_failures += 1;
                if self.cap_reached() {
                    return self.finish(CycleOutcome::GaveUp);
                }
                self.backoffs += 1;
                self.state = CycleState::BackingOff;
                CycleAction::Backoff(self.policy.launch_backoff)
            }
            (CycleState::Launching, CycleEvent::LaunchSucceeded) => {
                self.launches += 1;
                self.state = CycleState::Verifying;
                CycleAction::Verify(self.policy.verify_delay)
            }
            (CycleState::BackingOff, CycleEvent::BackoffElapsed) => {
                self.state = CycleState::Launching;
                CycleAction::Launch
            }
            (CycleState::Verifying, CycleEvent::Probed { alive: true }) => {
                self.finish(CycleOutcome::Alive)
            }
            (CycleState::Verifying, CycleEvent::Probed { alive: false }) => {
                // Exited right after start: relaunch without backoff.
                self.immediate_exits += 1;
                if self.cap_reached() {
                    return self.finish(CycleOutcome::GaveUp);
                }
                self.state = CycleState::Launching;
                CycleAction::Launch
            }
            (state, event) => {
                warn!(?state, ?event, "spawn cycle ignored unexpected event");
                self.pending_action()
            }
        }
    }

    /// Stop the cycle wherever it is.
    ///
    /// A cycle that already finished keeps its outcome.
    pub fn cancel(&mut self) -> CycleAction {
        match self.state {
            CycleState::Done(outcome) => CycleAction::Finish(outcome),
            _ => self.finish(CycleOutcome::Cancelled),
        }
    }

    /// Build the report for `command`. Only meaningful once finished; an
    /// unfinished cycle reports `Cancelled`.
    pub fn into_report(self, command: ManagedCommand) -> CycleReport {
        let outcome = match self.state {
            CycleState::Done(outcome) => outcome,
            _ => CycleOutcome::Cancelled,
        };
        CycleReport {
            command,
            outcome,
            launches: self.launches,
            launch_failures: self.launch_failures,
            immediate_exits: self.immediate_exits,
            backoffs: self.backoffs,
        }
    }

    fn cap_reached(&self) -> bool {
        self.policy
            .max_launch_attempts
            .is_some_and(|max| self.launches >= max)
    }

    fn finish(&mut self, outcome: CycleOutcome) -> CycleAction {
        self.state = CycleState::Done(outcome);
        CycleAction::Finish(outcome)
    }

    fn pending_action(&self) -> CycleAction {
        match self.state {
            CycleState::Launching => CycleAction::Launch,
            CycleState::BackingOff => CycleAction::Backoff(self.policy.launch_backoff),
            CycleState::Verifying => CycleAction::Verify(self.policy.verify_delay),
            CycleState::Done(outcome) => CycleAction::Finish(outcome),
        }
    }
}
