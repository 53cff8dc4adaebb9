//! Deadline-bounded polling.
//!
//! The scheduler offers no completion callback, so waiting for a task is a
//! loop of status checks separated by a fixed interval.

use std::cell::RefCell;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{Clock, TaskExaminer};
use crate::domain::TaskInfo;

/// Interval between task status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Call `check` until it returns `Ok(true)` or `timeout` elapses, sleeping
/// `interval` between calls.
///
/// Returns `Ok(false)` on timeout. A zero timeout performs no checks.
///
/// # Errors
///
/// Propagates the first error returned by `check`.
pub async fn poll_until<C, F, Fut>(
    clock: &C,
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<bool>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = clock.now() + timeout;
    while deadline > clock.now() {
        if check().await? {
            return Ok(true);
        }
        tracing::trace!(?interval, "condition not met, sleeping");
        clock.sleep(interval).await;
    }
    Ok(false)
}

/// Where a build task ended up once the caller stopped waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Completed,
    Failed(String),
    /// The task is still running on the cluster.
    TimedOut,
}

/// Wait for the build task `task_guid` to leave its in-flight states.
///
/// # Errors
///
/// Returns an error if a status request fails.
pub async fn wait_for_build(
    examiner: &impl TaskExaminer,
    clock: &impl Clock,
    task_guid: &str,
    timeout: Duration,
) -> Result<BuildOutcome> {
    let last: RefCell<Option<TaskInfo>> = RefCell::new(None);
    let last_ref = &last;
    let finished = poll_until(clock, POLL_INTERVAL, timeout, move || async move {
        let info = examiner.task_status(task_guid).await?;
        let done = !info.state.is_in_flight();
        *last_ref.borrow_mut() = Some(info);
        Ok(done)
    })
    .await?;

    Ok(match last.into_inner() {
        Some(info) if finished && info.failed => BuildOutcome::Failed(info.failure_reason),
        Some(_) if finished => BuildOutcome::Completed,
        _ => BuildOutcome::TimedOut,
    })
}
