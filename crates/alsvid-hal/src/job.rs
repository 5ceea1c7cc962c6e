//! Job identity and status types.
//!
//! The client-observed state machine:
//!
//! ```text
//!   Submitting ──→ Submitted ──→ Done
//!        │             │
//!        ├──→ Retrying ┤   (communication fault, budget remaining)
//!        │        │    │
//!        │        └────┘   (connectivity restored)
//!        │
//!        └──→ Failed       (budget exhausted; recoverable via retry())
//! ```
//!
//! **Invariants:**
//! - `Done` is terminal and is reached whether the job completed, failed,
//!   or was canceled; the server-side outcome is reported separately as
//!   [`RemoteStatus`].
//! - `last_good_state` never holds `Retrying` or `Failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Unique identifier for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// State of a submitted job as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmittedState {
    /// The problem is still being submitted.
    Submitting,
    /// The problem has been submitted but is not done yet.
    Submitted,
    /// The problem is done (completed, failed, or canceled).
    Done,
    /// A communication fault occurred; submission/polling is being retried.
    Retrying,
    /// A communication fault occurred and the retry budget is exhausted.
    Failed,
}

impl SubmittedState {
    /// Whether this is the terminal state.
    pub fn is_done(&self) -> bool {
        matches!(self, SubmittedState::Done)
    }

    /// Whether [`retry`](crate::submitted::SubmittedProblem::retry) is
    /// meaningful in this state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmittedState::Retrying | SubmittedState::Failed)
    }
}

impl std::fmt::Display for SubmittedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmittedState::Submitting => write!(f, "Submitting"),
            SubmittedState::Submitted => write!(f, "Submitted"),
            SubmittedState::Done => write!(f, "Done"),
            SubmittedState::Retrying => write!(f, "Retrying"),
            SubmittedState::Failed => write!(f, "Failed"),
        }
    }
}

/// Status of a job as reported by the backend server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    /// No server response yet (still submitting).
    Unknown,
    /// Waiting in a queue.
    Pending,
    /// Being solved, or about to be.
    InProgress,
    /// Solving succeeded.
    Completed,
    /// Solving failed.
    Failed,
    /// Canceled by the user.
    Canceled,
}

impl RemoteStatus {
    /// Whether the server-side outcome is final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Completed | RemoteStatus::Failed | RemoteStatus::Canceled
        )
    }
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::Unknown => write!(f, "Unknown"),
            RemoteStatus::Pending => write!(f, "Pending"),
            RemoteStatus::InProgress => write!(f, "InProgress"),
            RemoteStatus::Completed => write!(f, "Completed"),
            RemoteStatus::Failed => write!(f, "Failed"),
            RemoteStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// One backend poll's worth of raw status, before the client state machine
/// interprets it.
///
/// Timestamps are optional: a job that is still being submitted has no
/// received time, and only finished jobs have a solved time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Remote problem ID.
    pub id: JobId,
    /// Server-reported status.
    pub remote_status: RemoteStatus,
    /// Time the server received the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_received: Option<DateTime<Utc>>,
    /// Time the problem finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_solved: Option<DateTime<Utc>>,
    /// Server-reported error message for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Immutable status snapshot of an asynchronously submitted problem.
///
/// Produced on demand by [`SubmittedProblem::status`]; never mutated after
/// creation.
///
/// [`SubmittedProblem::status`]: crate::submitted::SubmittedProblem::status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemStatus {
    /// Remote problem ID.
    pub id: JobId,
    /// Time the server received the problem, once known.
    pub time_received: Option<DateTime<Utc>>,
    /// Time the problem finished, once known.
    pub time_solved: Option<DateTime<Utc>>,
    /// State as seen by this client.
    pub state: SubmittedState,
    /// Last state that was not `Retrying` or `Failed`.
    pub last_good_state: SubmittedState,
    /// Status reported by the server.
    pub remote_status: RemoteStatus,
    /// Error associated with a failed or canceled job, if any.
    pub error: Option<SolverError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_retryable_predicates() {
        assert!(SubmittedState::Done.is_done());
        assert!(!SubmittedState::Submitted.is_done());
        assert!(SubmittedState::Retrying.is_retryable());
        assert!(SubmittedState::Failed.is_retryable());
        assert!(!SubmittedState::Submitting.is_retryable());

        assert!(RemoteStatus::Completed.is_terminal());
        assert!(RemoteStatus::Canceled.is_terminal());
        assert!(!RemoteStatus::Pending.is_terminal());
        assert!(!RemoteStatus::Unknown.is_terminal());
    }
}
