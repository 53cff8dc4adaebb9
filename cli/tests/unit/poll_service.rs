//! Tests for deadline-bounded polling and build completion.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::Cell;
use std::time::Duration;

use droplet_cli::application::services::poll::{
    BuildOutcome, POLL_INTERVAL, poll_until, wait_for_build,
};
use droplet_cli::domain::scheduler::TaskState;

use crate::mocks::{FakeClock, FakeScheduler, task};

#[tokio::test]
async fn test_poll_until_zero_timeout_never_checks() {
    let clock = FakeClock::default();
    let calls = Cell::new(0);
    let done = poll_until(&clock, POLL_INTERVAL, Duration::ZERO, || async {
        calls.set(calls.get() + 1);
        Ok(true)
    })
    .await
    .expect("poll");
    assert!(!done);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn test_poll_until_sleeps_between_checks() {
    let clock = FakeClock::default();
    let calls = Cell::new(0);
    let done = poll_until(&clock, POLL_INTERVAL, Duration::from_secs(10), || async {
        calls.set(calls.get() + 1);
        Ok(calls.get() == 3)
    })
    .await
    .expect("poll");
    assert!(done);
    assert_eq!(calls.get(), 3);
    assert_eq!(*clock.sleeps.lock().unwrap(), [POLL_INTERVAL, POLL_INTERVAL]);
}

#[tokio::test]
async fn test_poll_until_propagates_check_errors() {
    let clock = FakeClock::default();
    let err = poll_until(&clock, POLL_INTERVAL, Duration::from_secs(10), || async {
        anyhow::bail!("receptor unreachable")
    })
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "receptor unreachable");
}

#[tokio::test]
async fn test_wait_for_build_completes_after_running() {
    let scheduler = FakeScheduler::with_statuses([
        task(TaskState::Pending, ""),
        task(TaskState::Claimed, ""),
        task(TaskState::Running, ""),
        task(TaskState::Completed, ""),
    ]);
    let outcome = wait_for_build(
        &scheduler,
        &FakeClock::default(),
        "build-droplet-app",
        Duration::from_secs(60),
    )
    .await
    .expect("wait");
    assert_eq!(outcome, BuildOutcome::Completed);
    assert_eq!(*scheduler.status_calls.lock().unwrap(), 4);
}

#[tokio::test]
async fn test_wait_for_build_reports_failure_reason() {
    let scheduler = FakeScheduler::with_statuses([
        task(TaskState::Running, ""),
        task(TaskState::Completed, "no buildpack detected"),
    ]);
    let outcome = wait_for_build(
        &scheduler,
        &FakeClock::default(),
        "build-droplet-app",
        Duration::from_secs(60),
    )
    .await
    .expect("wait");
    assert_eq!(outcome, BuildOutcome::Failed("no buildpack detected".to_string()));
}

#[tokio::test]
async fn test_wait_for_build_times_out_while_running() {
    let scheduler = FakeScheduler::with_statuses([task(TaskState::Running, "")]);
    let clock = FakeClock::default();
    let outcome = wait_for_build(&scheduler, &clock, "build-droplet-app", Duration::from_secs(5))
        .await
        .expect("wait");
    assert_eq!(outcome, BuildOutcome::TimedOut);
    assert_eq!(*scheduler.status_calls.lock().unwrap(), 5);
}

#[tokio::test]
async fn test_wait_for_build_surfaces_status_errors() {
    let scheduler = FakeScheduler::default();
    let err = wait_for_build(
        &scheduler,
        &FakeClock::default(),
        "build-droplet-app",
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("404"), "got: {err}");
}
