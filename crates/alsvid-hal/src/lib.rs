//! Hardware abstraction layer for quadratic optimization solvers.
//!
//! This crate defines the contract between problem-building code and an
//! opaque solving service, plus the client-side job lifecycle built on top
//! of it:
//!
//! - [`SolverBackend`]: the async trait a solving service implements.
//! - [`Solver`]: a cheap, cloneable handle that validates and delegates.
//! - [`SubmittedProblem`]: the asynchronous submission state machine, with
//!   polling, fault absorption, retry, cancellation, and single-consumption
//!   result extraction.
//! - [`SolverParameters`]: capability-keyed parameter sets.
//! - [`SolverError`]: the error taxonomy shared by all backends.
//!
//! The layer spawns no background tasks; progress happens when the caller
//! polls or awaits.

pub mod backend;
pub mod config;
pub mod embed;
pub mod error;
pub mod fix;
pub mod job;
pub mod params;
pub mod result;
pub mod solver;
pub mod submitted;

pub use backend::{IsingRanges, SolverBackend, SolverProperties};
pub use config::SolverConfig;
pub use embed::{BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters};
pub use error::{SolverError, SolverResult};
pub use fix::{FixVariablesMethod, FixVariablesResult};
pub use job::{JobId, ProblemStatus, RemoteStatus, StatusSnapshot, SubmittedState};
pub use params::{ProblemKind, SolverKind, SolverParameters};
pub use result::{SolveResult, SolveTiming, UNUSED_QUBIT};
pub use solver::Solver;
pub use submitted::{DEFAULT_RETRY_BUDGET, SubmittedProblem, await_completion};
