// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::engine::cycle::{CycleAction, CycleEvent, SpawnCycle};
use crate::engine::{CycleOutcome, CycleReport, PassSummary, RetryPolicy};
use crate::errors::Result;
use crate::exec::Launcher;
use crate::fs::{FileSystem, RealFileSystem};
use crate::probe::LivenessProber;
use crate::registry::{ManagedCommand, Registry};

/// Identity of a registry entry across passes: its command line plus how
/// many earlier entries carry the same command line. Deleting unrelated lines
/// does not change it, and duplicate names stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    command_line: String,
    occurrence: usize,
}

fn entry_keys(entries: &[ManagedCommand]) -> Vec<EntryKey> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    entries
        .iter()
        .map(|cmd| {
            let count = seen.entry(cmd.command_line.as_str()).or_insert(0);
            let key = EntryKey {
                command_line: cmd.command_line.clone(),
                occurrence: *count,
            };
            *count += 1;
            key
        })
        .collect()
}

/// A spawn cycle that is still running and the token that stops it.
#[derive(Debug)]
struct InFlight {
    handle: JoinHandle<CycleReport>,
    cancel: CancellationToken,
}

/// Keeps the registry's commands alive.
///
/// Every `interval` the registry is reloaded; each entry that the prober does
/// not see running gets its own Tokio task driving a [`SpawnCycle`]. The
/// reconciler holds no durable state and no process handles, only the join
/// handles of cycles that are still running.
pub struct Reconciler<L, P, F = RealFileSystem>
where
    L: Launcher + 'static,
    P: LivenessProber + 'static,
    F: FileSystem,
{
    registry: Registry<F>,
    launcher: Arc<L>,
    prober: Arc<P>,
    policy: RetryPolicy,
    interval: Duration,
    in_flight: HashMap<EntryKey, InFlight>,
}

impl<L, P, F> fmt::Debug for Reconciler<L, P, F>
where
    L: Launcher + 'static,
    P: LivenessProber + 'static,
    F: FileSystem,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("interval", &self.interval)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl<L, P, F> Reconciler<L, P, F>
where
    L: Launcher + 'static,
    P: LivenessProber + 'static,
    F: FileSystem,
{
    pub fn new(
        registry: Registry<F>,
        launcher: Arc<L>,
        prober: Arc<P>,
        policy: RetryPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            launcher,
            prober,
            policy,
            interval,
            in_flight: HashMap::new(),
        }
    }

    /// Number of spawn cycles started by earlier passes that have not been
    /// reaped yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Main loop.
    ///
    /// - Runs a pass, then waits for `interval` or `shutdown`, whichever
    ///   comes first.
    /// - On shutdown, in-flight cycles see the same cancellation (they run
    ///   under child tokens) and the loop waits for them to wind down.
    ///   Processes they already launched keep running.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            registry = ?self.registry.path(),
            interval = ?self.interval,
            "reconciler started"
        );

        while !shutdown.is_cancelled() {
            let summary = self.reconcile_pass(&shutdown).await;
            debug!(?summary, "reconciliation pass complete");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!(in_flight = self.in_flight.len(), "stop requested; waiting for spawn cycles");
        let reports = self.drain().await;
        let cancelled = reports
            .iter()
            .filter(|r| r.outcome == CycleOutcome::Cancelled)
            .count();
        info!(cancelled, "reconciler stopped");
        Ok(())
    }

    /// One reconciliation pass: load the registry, stop the cycles of entries
    /// that were removed from it, and start a spawn cycle for every entry that
    /// is neither alive nor already being handled.
    ///
    /// A registry that cannot be read is logged and the pass does nothing.
    pub async fn reconcile_pass(&mut self, shutdown: &CancellationToken) -> PassSummary {
        self.reap_finished().await;

        let entries = match self.registry.load() {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to load registry; skipping pass");
                return PassSummary::default();
            }
        };
        let keys = entry_keys(&entries);

        let mut summary = PassSummary {
            loaded: entries.len(),
            removed: self.stop_removed(&keys).await,
            ..PassSummary::default()
        };

        for (cmd, key) in entries.into_iter().zip(keys) {
            if self.in_flight.contains_key(&key) {
                debug!(name = %cmd.name, "spawn cycle still running; skipping entry");
                summary.in_flight += 1;
                continue;
            }

            if self.prober.is_alive(&cmd.command_line).await {
                trace!(name = %cmd.name, "entry alive");
                summary.alive += 1;
                continue;
            }

            let cancel = shutdown.child_token();
            let handle = self.spawn_cycle(cmd, cancel.clone());
            self.in_flight.insert(key, InFlight { handle, cancel });
            summary.spawned += 1;
        }

        summary
    }

    /// Wait for every in-flight cycle and return their reports.
    pub async fn drain(&mut self) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(self.in_flight.len());
        for (key, in_flight) in self.in_flight.drain() {
            if let Some(report) = join_cycle(&key, in_flight.handle).await {
                reports.push(report);
            }
        }
        reports
    }

    /// Cancel and wait for the cycles whose entry is no longer in `current`.
    async fn stop_removed(&mut self, current: &[EntryKey]) -> usize {
        let removed: Vec<EntryKey> = self
            .in_flight
            .keys()
            .filter(|key| !current.contains(key))
            .cloned()
            .collect();

        for key in &removed {
            if let Some(in_flight) = self.in_flight.remove(key) {
                info!(command = %key.command_line, "entry removed from registry; stopping spawn cycle");
                in_flight.cancel.cancel();
                join_cycle(key, in_flight.handle).await;
            }
        }
        removed.len()
    }

    fn spawn_cycle(&self, cmd: ManagedCommand, cancel: CancellationToken) -> JoinHandle<CycleReport> {
        let launcher = Arc::clone(&self.launcher);
        let prober = Arc::clone(&self.prober);
        let policy = self.policy;

        tokio::spawn(async move {
            drive_cycle(cmd, launcher.as_ref(), prober.as_ref(), policy, &cancel).await
        })
    }

    async fn reap_finished(&mut self) {
        let finished: Vec<EntryKey> = self
            .in_flight
            .iter()
            .filter(|(_, in_flight)| in_flight.handle.is_finished())
            .map(|(key, _)| key.clone())
            .collect();

        for key in finished {
            if let Some(in_flight) = self.in_flight.remove(&key) {
                join_cycle(&key, in_flight.handle).await;
            }
        }
    }
}

async fn join_cycle(key: &EntryKey, handle: JoinHandle<CycleReport>) -> Option<CycleReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(command = %key.command_line, error = %e, "spawn cycle task failed");
            None
        }
    }
}

/// Drive one entry's spawn cycle to completion.
///
/// Launch, wait `verify_delay`, probe; relaunch right away if the process is
/// already gone, or after `launch_backoff` if it could not be started. Waits
/// end early when `cancel` fires.
pub async fn drive_cycle<L, P>(
    cmd: ManagedCommand,
    launcher: &L,
    prober: &P,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> CycleReport
where
    L: Launcher + ?Sized,
    P: LivenessProber + ?Sized,
{
    info!(name = %cmd.name, command = %cmd.command_line, "starting process");

    let mut cycle = SpawnCycle::new(policy);
    let mut action = cycle.start();

    loop {
        if cancel.is_cancelled() {
            action = cycle.cancel();
        }

        action = match action {
            CycleAction::Launch => match launcher.launch(&cmd) {
                Ok(log_path) => {
                    debug!(name = %cmd.name, log = ?log_path, "launch succeeded; verifying");
                    cycle.step(CycleEvent::LaunchSucceeded)
                }
                Err(e) => {
                    warn!(name = %cmd.name, error = %e, "failed to start process");
                    cycle.step(CycleEvent::LaunchFailed)
                }
            },
            CycleAction::Backoff(delay) => {
                tokio::select! {
                    _ = cancel.cancelled() => cycle.cancel(),
                    _ = sleep(delay) => cycle.step(CycleEvent::BackoffElapsed),
                }
            }
            CycleAction::Verify(delay) => {
                tokio::select! {
                    _ = cancel.cancelled() => cycle.cancel(),
                    _ = sleep(delay) => {
                        let alive = prober.is_alive(&cmd.command_line).await;
                        if !alive {
                            warn!(name = %cmd.name, "process exited immediately after start");
                        }
                        cycle.step(CycleEvent::Probed { alive })
                    }
                }
            }
            CycleAction::Finish(outcome) => {
                let report = cycle.into_report(cmd);
                match outcome {
                    CycleOutcome::Alive => info!(
                        name = %report.command.name,
                        launches = report.launches,
                        "process started successfully"
                    ),
                    CycleOutcome::GaveUp => warn!(
                        name = %report.command.name,
                        launches = report.launches,
                        "giving up on process until next pass"
                    ),
                    CycleOutcome::Cancelled => info!(
                        name = %report.command.name,
                        launches = report.launches,
                        "spawn cycle cancelled"
                    ),
                }
                return report;
            }
        };
    }
}
