//! The asynchronous submission state machine.
//!
//! A [`SubmittedProblem`] wraps a backend-side job handle and tracks the
//! client-observed lifecycle described in [`crate::job`]. It owns the
//! backend job resource: extracting the result consumes it, and dropping an
//! unconsumed handle releases it as a backstop.
//!
//! All waiting is caller-driven polling; no background tasks are spawned.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::backend::SolverBackend;
use crate::error::{SolverError, SolverResult};
use crate::job::{JobId, ProblemStatus, RemoteStatus, StatusSnapshot, SubmittedState};
use crate::result::SolveResult;

/// How many consecutive recoverable faults are absorbed before a job is
/// marked `Failed`.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Interval between status polls while awaiting completion.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct JobInner {
    state: SubmittedState,
    last_good_state: SubmittedState,
    remote_status: RemoteStatus,
    time_received: Option<DateTime<Utc>>,
    time_solved: Option<DateTime<Utc>>,
    last_error: Option<SolverError>,
    retries_left: u32,
    consumed: bool,
    released: bool,
}

impl JobInner {
    fn apply_snapshot(&mut self, snap: &StatusSnapshot, budget: u32) {
        let state = if snap.remote_status.is_terminal() {
            SubmittedState::Done
        } else if snap.remote_status == RemoteStatus::Unknown {
            SubmittedState::Submitting
        } else {
            SubmittedState::Submitted
        };
        self.state = state;
        self.last_good_state = state;
        self.remote_status = snap.remote_status;
        self.time_received = snap.time_received;
        self.time_solved = snap.time_solved;
        // Connectivity is fine again; restore the full budget.
        self.retries_left = budget;
        self.last_error = match snap.remote_status {
            RemoteStatus::Failed => Some(SolverError::SolveFailed(
                snap.error.clone().unwrap_or_else(|| "solve failed".into()),
            )),
            RemoteStatus::Canceled => Some(SolverError::ProblemCanceled),
            _ => None,
        };
    }

    fn to_status(&self, id: JobId) -> ProblemStatus {
        ProblemStatus {
            id,
            time_received: self.time_received,
            time_solved: self.time_solved,
            state: self.state,
            last_good_state: self.last_good_state,
            remote_status: self.remote_status,
            error: self.last_error.clone(),
        }
    }
}

/// A problem submitted asynchronously to a solver.
///
/// Read-only operations ([`status`], [`done`]) may be called concurrently;
/// [`result`], [`cancel`], and [`retry`] are serialized through an internal
/// mutex so only one of them proceeds at a time.
///
/// [`status`]: SubmittedProblem::status
/// [`done`]: SubmittedProblem::done
/// [`result`]: SubmittedProblem::result
/// [`cancel`]: SubmittedProblem::cancel
/// [`retry`]: SubmittedProblem::retry
pub struct SubmittedProblem {
    backend: Arc<dyn SolverBackend>,
    id: JobId,
    inner: Mutex<JobInner>,
    op_gate: tokio::sync::Mutex<()>,
    retry_budget: u32,
}

impl SubmittedProblem {
    /// Wrap a freshly submitted job with the default retry budget.
    pub fn new(backend: Arc<dyn SolverBackend>, id: JobId) -> Self {
        Self::with_retry_budget(backend, id, DEFAULT_RETRY_BUDGET)
    }

    /// Wrap a freshly submitted job with an explicit retry budget.
    pub fn with_retry_budget(backend: Arc<dyn SolverBackend>, id: JobId, budget: u32) -> Self {
        Self {
            backend,
            id,
            inner: Mutex::new(JobInner {
                state: SubmittedState::Submitting,
                last_good_state: SubmittedState::Submitting,
                remote_status: RemoteStatus::Unknown,
                time_received: None,
                time_solved: None,
                last_error: None,
                retries_left: budget,
                consumed: false,
                released: false,
            }),
            op_gate: tokio::sync::Mutex::new(()),
            retry_budget: budget,
        }
    }

    /// The backend-assigned job identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Poll the backend once and return the resulting status snapshot.
    ///
    /// Recoverable communication faults are absorbed: the job moves to
    /// `Retrying` while budget remains, then `Failed`, and the fault is
    /// reported inside the snapshot rather than as an `Err`. Only
    /// non-recoverable errors propagate.
    pub async fn status(&self) -> SolverResult<ProblemStatus> {
        let poll = self.backend.poll_status(&self.id).await;
        let mut inner = self.lock();
        match poll {
            Ok(snap) => {
                if !inner.state.is_done() {
                    inner.apply_snapshot(&snap, self.retry_budget);
                }
            }
            Err(e) if e.is_retryable() => {
                if !inner.state.is_done() {
                    if inner.retries_left > 0 {
                        inner.retries_left -= 1;
                        inner.state = SubmittedState::Retrying;
                    } else {
                        inner.state = SubmittedState::Failed;
                    }
                    debug!(job = %self.id, state = %inner.state, error = %e,
                        "communication fault while polling");
                    inner.last_error = Some(e);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(inner.to_status(self.id.clone()))
    }

    /// Whether the job has reached `Done`, as of the most recent poll.
    ///
    /// Non-blocking and performs no backend round trip; call [`status`] or
    /// [`await_completion`] to drive progress.
    ///
    /// [`status`]: SubmittedProblem::status
    /// [`await_completion`]: SubmittedProblem::await_completion
    pub fn done(&self) -> bool {
        self.lock().state.is_done()
    }

    /// Request cancellation.
    ///
    /// Has no observable synchronous effect; the eventual transition to
    /// `Done` with [`RemoteStatus::Canceled`] is asynchronous and not
    /// guaranteed to be immediate.
    pub async fn cancel(&self) {
        let _gate = self.op_gate.lock().await;
        if self.lock().state.is_done() {
            return;
        }
        if let Err(e) = self.backend.cancel(&self.id).await {
            warn!(job = %self.id, error = %e, "cancel request failed");
        }
    }

    /// Resume a job that hit a recoverable communication fault.
    ///
    /// Valid only in `Retrying` or `Failed`: restores the last good state
    /// and the full retry budget, then notifies the backend. A no-op in any
    /// other state.
    pub async fn retry(&self) {
        let _gate = self.op_gate.lock().await;
        {
            let mut inner = self.lock();
            if !inner.state.is_retryable() {
                return;
            }
            inner.retries_left = self.retry_budget;
            inner.state = inner.last_good_state;
            inner.last_error = None;
            debug!(job = %self.id, state = %inner.state, "resuming after fault");
        }
        if let Err(e) = self.backend.retry(&self.id).await {
            warn!(job = %self.id, error = %e, "retry request failed");
        }
    }

    /// Wait until the job reaches `Done` or the timeout elapses.
    ///
    /// Returns `true` only in the completed case. Safe to call repeatedly;
    /// the idiomatic usage is a loop re-calling this until it returns
    /// `true`.
    pub async fn await_completion(&self, timeout: Duration) -> bool {
        await_completion(&[self], 1, timeout).await
    }

    /// Retrieve the result of a finished job.
    ///
    /// Fails with [`SolverError::AsyncNotDone`] before `Done`, with
    /// [`SolverError::ProblemCanceled`] / [`SolverError::SolveFailed`] for
    /// those server-side outcomes, and with `AsyncNotDone` again once the
    /// result has been consumed — a successful call consumes the
    /// backend-side job resource, so at most one succeeds.
    pub async fn result(&self) -> SolverResult<SolveResult> {
        let _gate = self.op_gate.lock().await;
        {
            let inner = self.lock();
            if inner.consumed {
                return Err(SolverError::AsyncNotDone("result already consumed".into()));
            }
            if !inner.state.is_done() {
                return Err(SolverError::AsyncNotDone(format!(
                    "problem is in state {}",
                    inner.state
                )));
            }
            match inner.remote_status {
                RemoteStatus::Canceled => return Err(SolverError::ProblemCanceled),
                RemoteStatus::Failed => {
                    return Err(inner
                        .last_error
                        .clone()
                        .unwrap_or_else(|| SolverError::SolveFailed("solve failed".into())));
                }
                _ => {}
            }
        }

        let result = self.backend.result(&self.id).await?;
        let mut inner = self.lock();
        inner.consumed = true;
        inner.released = true;
        Ok(result)
    }
}

impl Drop for SubmittedProblem {
    /// Backstop release of the backend job resource.
    ///
    /// The primary release path is [`SubmittedProblem::result`]; this only
    /// covers handles that were never awaited nor consumed.
    fn drop(&mut self) {
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !inner.released {
            inner.released = true;
            self.backend.release(&self.id);
        }
    }
}

impl std::fmt::Debug for SubmittedProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SubmittedProblem")
            .field("id", &self.id)
            .field("state", &inner.state)
            .field("remote_status", &inner.remote_status)
            .field("consumed", &inner.consumed)
            .finish()
    }
}

/// Wait until at least `min_done` of `jobs` reach `Done`, or the timeout
/// elapses. Returns whether the threshold was met.
///
/// `min_done` is clamped to `1..=jobs.len()`; an empty slice is trivially
/// satisfied. Awaiting a single job with `min_done == 1` is equivalent to
/// [`SubmittedProblem::await_completion`].
pub async fn await_completion(
    jobs: &[&SubmittedProblem],
    min_done: usize,
    timeout: Duration,
) -> bool {
    if jobs.is_empty() {
        return true;
    }
    let min_done = min_done.clamp(1, jobs.len());
    let deadline = Instant::now() + timeout;

    loop {
        let mut done = 0usize;
        for job in jobs {
            if job.done() {
                done += 1;
                continue;
            }
            match job.status().await {
                Ok(s) if s.state.is_done() => done += 1,
                Ok(_) => {}
                Err(e) => {
                    debug!(job = %job.id(), error = %e, "status poll failed while awaiting");
                }
            }
        }
        if done >= min_done {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
