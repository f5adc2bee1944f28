use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use respawn::engine::{CycleOutcome, PassSummary, Reconciler, RetryPolicy, drive_cycle};
use respawn::exec::ShellSpawner;
use respawn::logs::LogPaths;
use respawn::registry::{ManagedCommand, Registry};
use respawn_test_utils::builders::{attempt_logs, fast_policy, write_registry};
use respawn_test_utils::fake_launcher::ScriptedLauncher;
use respawn_test_utils::fake_prober::ScriptedProber;
use respawn_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const INTERVAL: Duration = Duration::from_millis(50);

fn registry_with(dir: &TempDir, lines: &[&str]) -> Registry {
    Registry::new(write_registry(dir.path().join("registry.txt"), lines))
}

fn worker() -> ManagedCommand {
    ManagedCommand {
        name: "worker".to_string(),
        command_line: "python3 job.py".to_string(),
    }
}

async fn wait_for_launches(launcher: &ScriptedLauncher, n: usize) {
    for _ in 0..500 {
        if launcher.launch_count() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("launcher never reached {n} launches");
}

#[tokio::test]
async fn alive_entries_never_enter_a_spawn_cycle() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::new());
    let prober = Arc::new(ScriptedProber::all_alive());

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py", "api node server.js"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    let summary = reconciler.reconcile_pass(&CancellationToken::new()).await;

    assert_eq!(
        summary,
        PassSummary {
            loaded: 2,
            removed: 0,
            alive: 2,
            in_flight: 0,
            spawned: 0,
        }
    );
    assert!(reconciler.drain().await.is_empty());
    assert_eq!(launcher.launch_count(), 0);
    assert_eq!(prober.calls(), vec!["python3 job.py", "node server.js"]);
    Ok(())
}

#[tokio::test]
async fn dead_entry_is_launched_and_verified() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::new());
    let prober = Arc::new(ScriptedProber::all_dead());
    // Dead at the pass check, alive at verification.
    prober.script("python3 job.py", &[false, true]);

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    let summary = reconciler.reconcile_pass(&CancellationToken::new()).await;
    assert_eq!(summary.spawned, 1);

    let reports = with_timeout(reconciler.drain()).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, CycleOutcome::Alive);
    assert_eq!(reports[0].command, worker());
    assert_eq!(reports[0].launches, 1);
    assert_eq!(launcher.launched(), vec![worker()]);
    Ok(())
}

#[tokio::test]
async fn two_failed_launches_then_success_waits_two_backoffs() {
    init_tracing();
    let launcher = ScriptedLauncher::failing_first(2);
    let prober = ScriptedProber::all_alive();

    let report = with_timeout(drive_cycle(
        worker(),
        &launcher,
        &prober,
        fast_policy(),
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(report.outcome, CycleOutcome::Alive);
    assert_eq!(report.backoffs, 2);
    assert_eq!(report.launches, 3);
    assert_eq!(report.launch_failures, 2);
    assert_eq!(launcher.launch_count(), 3);
    // Only the successful launch is verified.
    assert_eq!(prober.calls().len(), 1);
}

#[tokio::test]
async fn immediate_exit_relaunches_without_backoff_delay() {
    init_tracing();
    let launcher = ScriptedLauncher::new();
    let prober = ScriptedProber::all_dead();
    prober.script("python3 job.py", &[false, true]);

    // A backoff this long would trip the timeout if it were applied.
    let policy = RetryPolicy {
        launch_backoff: Duration::from_secs(60),
        ..fast_policy()
    };

    let report = with_timeout(drive_cycle(
        worker(),
        &launcher,
        &prober,
        policy,
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(report.outcome, CycleOutcome::Alive);
    assert_eq!(report.launches, 2);
    assert_eq!(report.immediate_exits, 1);
    assert_eq!(report.backoffs, 0);
}

#[tokio::test]
async fn retry_cap_gives_up() {
    init_tracing();
    let launcher = ScriptedLauncher::always_failing();
    let prober = ScriptedProber::all_dead();
    let policy = RetryPolicy {
        max_launch_attempts: Some(4),
        ..fast_policy()
    };

    let report = with_timeout(drive_cycle(
        worker(),
        &launcher,
        &prober,
        policy,
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(report.outcome, CycleOutcome::GaveUp);
    assert_eq!(launcher.launch_count(), 4);
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
    init_tracing();
    let launcher = Arc::new(ScriptedLauncher::always_failing());
    let prober = Arc::new(ScriptedProber::all_dead());
    let cancel = CancellationToken::new();
    let policy = RetryPolicy {
        launch_backoff: Duration::from_secs(60),
        ..fast_policy()
    };

    let handle = {
        let launcher = Arc::clone(&launcher);
        let prober = Arc::clone(&prober);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            drive_cycle(worker(), launcher.as_ref(), prober.as_ref(), policy, &cancel).await
        })
    };

    wait_for_launches(&launcher, 1).await;
    cancel.cancel();

    let report = with_timeout(handle).await.expect("cycle task panicked");
    assert_eq!(report.outcome, CycleOutcome::Cancelled);
    assert_eq!(report.launches, 1);
}

#[tokio::test]
async fn entry_with_running_cycle_is_not_spawned_again() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::always_failing());
    let prober = Arc::new(ScriptedProber::all_dead());
    let policy = RetryPolicy {
        launch_backoff: Duration::from_secs(60),
        ..fast_policy()
    };
    let shutdown = CancellationToken::new();

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        policy,
        INTERVAL,
    );

    assert_eq!(reconciler.reconcile_pass(&shutdown).await.spawned, 1);
    wait_for_launches(&launcher, 1).await;

    let second = reconciler.reconcile_pass(&shutdown).await;
    assert_eq!(second.in_flight, 1);
    assert_eq!(second.spawned, 0);
    assert_eq!(reconciler.in_flight(), 1);

    shutdown.cancel();
    let reports = with_timeout(reconciler.drain()).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, CycleOutcome::Cancelled);
    assert_eq!(launcher.launch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn removing_an_entry_stops_its_running_cycle() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::always_failing());
    let prober = Arc::new(ScriptedProber::all_dead());
    let shutdown = CancellationToken::new();

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    assert_eq!(reconciler.reconcile_pass(&shutdown).await.spawned, 1);
    wait_for_launches(&launcher, 2).await;

    write_registry(dir.path().join("registry.txt"), &[]);
    let summary = with_timeout(reconciler.reconcile_pass(&shutdown)).await;

    assert_eq!(summary.loaded, 0);
    assert_eq!(summary.removed, 1);
    assert_eq!(reconciler.in_flight(), 0);

    // No launches once the cycle has been stopped.
    let launches = launcher.launch_count();
    tokio::time::sleep(fast_policy().launch_backoff * 5).await;
    assert_eq!(launcher.launch_count(), launches);
    assert!(!shutdown.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn deleting_an_earlier_line_keeps_later_cycles_unique() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::always_failing());
    let prober = Arc::new(ScriptedProber::all_dead());
    let policy = RetryPolicy {
        launch_backoff: Duration::from_secs(60),
        ..fast_policy()
    };
    let shutdown = CancellationToken::new();

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["api node server.js", "worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        policy,
        INTERVAL,
    );

    assert_eq!(reconciler.reconcile_pass(&shutdown).await.spawned, 2);
    wait_for_launches(&launcher, 2).await;

    write_registry(dir.path().join("registry.txt"), &["worker python3 job.py"]);
    let summary = with_timeout(reconciler.reconcile_pass(&shutdown)).await;

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.in_flight, 1);
    assert_eq!(summary.spawned, 0);
    assert_eq!(reconciler.in_flight(), 1);

    shutdown.cancel();
    let reports = with_timeout(reconciler.drain()).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].command, worker());
    assert_eq!(launcher.launch_count(), 2);
    Ok(())
}

#[tokio::test]
async fn duplicate_names_get_independent_cycles() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::new());
    let prober = Arc::new(ScriptedProber::all_dead());
    prober.script("python3 a.py", &[false, true]);
    prober.script("python3 b.py", &[false, true]);

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["python3 python3 a.py", "python3 python3 b.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    assert_eq!(
        reconciler
            .reconcile_pass(&CancellationToken::new())
            .await
            .spawned,
        2
    );

    let reports = with_timeout(reconciler.drain()).await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome == CycleOutcome::Alive));

    let mut launched: Vec<String> = launcher
        .launched()
        .into_iter()
        .map(|c| c.command_line)
        .collect();
    launched.sort();
    assert_eq!(launched, vec!["python3 a.py", "python3 b.py"]);
    Ok(())
}

#[tokio::test]
async fn unreadable_registry_skips_the_pass() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("registry.txt");
    std::fs::create_dir(&path)?;
    let launcher = Arc::new(ScriptedLauncher::new());

    let mut reconciler = Reconciler::new(
        Registry::new(path),
        Arc::clone(&launcher),
        Arc::new(ScriptedProber::all_dead()),
        fast_policy(),
        INTERVAL,
    );

    let summary = reconciler.reconcile_pass(&CancellationToken::new()).await;

    assert_eq!(summary, PassSummary::default());
    assert_eq!(launcher.launch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn worker_scenario_creates_exactly_one_log() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log_dir = dir.path().join("logs");
    std::fs::create_dir(&log_dir)?;

    let spawner = Arc::new(ShellSpawner::new("sh", LogPaths::new(&log_dir)));
    let prober = Arc::new(ScriptedProber::all_dead());
    prober.script("python3 job.py", &[false, true]);
    prober.set_alive("python3 job.py", true);

    let mut reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        spawner,
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    let shutdown = CancellationToken::new();
    assert_eq!(reconciler.reconcile_pass(&shutdown).await.spawned, 1);
    let reports = with_timeout(reconciler.drain()).await;
    assert_eq!(reports[0].outcome, CycleOutcome::Alive);
    assert_eq!(reports[0].launches, 1);

    // Next pass sees it alive and leaves it alone.
    let next = reconciler.reconcile_pass(&shutdown).await;
    assert_eq!(next.alive, 1);
    assert_eq!(next.spawned, 0);

    assert_eq!(attempt_logs(&log_dir, "worker").len(), 1);
    Ok(())
}

#[tokio::test]
async fn run_returns_after_shutdown() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::new());
    let prober = Arc::new(ScriptedProber::all_alive());

    let reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::clone(&prober),
        fast_policy(),
        INTERVAL,
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(reconciler.run(shutdown.clone()));

    // Let a few passes happen.
    tokio::time::sleep(INTERVAL * 3).await;
    shutdown.cancel();

    with_timeout(handle).await??;
    assert!(prober.calls().len() >= 2);
    assert_eq!(launcher.launch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_in_flight_cycles() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let launcher = Arc::new(ScriptedLauncher::always_failing());
    let policy = RetryPolicy {
        launch_backoff: Duration::from_secs(60),
        ..fast_policy()
    };

    let reconciler = Reconciler::new(
        registry_with(&dir, &["worker python3 job.py"]),
        Arc::clone(&launcher),
        Arc::new(ScriptedProber::all_dead()),
        policy,
        Duration::from_secs(60),
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(reconciler.run(shutdown.clone()));

    wait_for_launches(&launcher, 1).await;
    shutdown.cancel();

    // Both the outer wait and the cycle's backoff are 60s; returning at all
    // means cancellation reached the cycle.
    with_timeout(handle).await??;
    assert_eq!(launcher.launch_count(), 1);
    Ok(())
}
