//! Backend trait and solver properties.
//!
//! [`SolverBackend`] is the boundary contract every solving service —
//! native library, remote annealer, or in-process software solver — must
//! satisfy. The job lifecycle it exposes:
//!
//! ```text
//!   properties() ──→ submit() ──→ poll_status() ──→ result()
//!    (sync, &ref)     (async)        (async)          (async, consuming)
//! ```
//!
//! ## Design principles
//!
//! - **Async-native**: all I/O methods are async; the library spawns no
//!   background workers — whoever awaits, polls.
//! - **Thread-safe**: `Send + Sync` bound enables shared ownership.
//! - **Infallible introspection**: `properties()` is synchronous — a
//!   backend that cannot report its properties without I/O is not
//!   correctly initialized.
//! - **Explicit release**: `release()` is synchronous and infallible so a
//!   job handle can free its backend resource from `Drop` as a backstop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use alsvid_model::{Embedding, Problem};

use crate::embed::{BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters};
use crate::error::SolverResult;
use crate::fix::{FixVariablesMethod, FixVariablesResult};
use crate::job::{JobId, StatusSnapshot};
use crate::params::{ProblemKind, SolverKind, SolverParameters};
use crate::result::SolveResult;

/// Allowed coefficient ranges of a solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsingRanges {
    /// Minimum linear coefficient.
    pub h_min: f64,
    /// Maximum linear coefficient.
    pub h_max: f64,
    /// Minimum coupling coefficient.
    pub j_min: f64,
    /// Maximum coupling coefficient.
    pub j_max: f64,
}

impl Default for IsingRanges {
    fn default() -> Self {
        Self {
            h_min: -1.0,
            h_max: 1.0,
            j_min: -1.0,
            j_max: 1.0,
        }
    }
}

/// Static description of a solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverProperties {
    /// Problem encodings the solver accepts.
    pub supported_problem_kinds: Vec<ProblemKind>,
    /// Total number of qubits, working or not.
    pub num_qubits: usize,
    /// Working qubit indices.
    pub qubits: Vec<usize>,
    /// Working couplers.
    pub couplers: Vec<(usize, usize)>,
    /// Coefficient ranges, when the solver constrains them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ising_ranges: Option<IsingRanges>,
}

/// Contract between the job lifecycle and an opaque solving service.
///
/// # Contract
///
/// - `properties()` MUST be synchronous and infallible; implementations
///   cache them at construction time.
/// - `submit()` returns as soon as the backend accepts the problem; it
///   reports only submission-time failures, never later runtime ones.
/// - `poll_status()` is a single read of current state and MUST NOT block
///   waiting for a state change.
/// - `result()` consumes the backend-side job resource on success; at most
///   one successful call is made per job.
/// - `release()` frees the backend-side job resource without consuming the
///   result; it MUST tolerate being called for an already-released job.
#[async_trait]
pub trait SolverBackend: Send + Sync {
    /// Name of the solver.
    fn name(&self) -> &str;

    /// Category of this solver, used to pick a parameter set.
    fn kind(&self) -> SolverKind;

    /// Static solver properties, cached at construction time.
    fn properties(&self) -> &SolverProperties;

    /// Solve a problem, blocking the calling task until the backend
    /// produces an answer. No timeout is enforced at this layer.
    async fn solve(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult>;

    /// Begin asynchronous execution of a problem.
    async fn submit(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<JobId>;

    /// Read the current status of a job. Single poll; never blocks for a
    /// state change.
    async fn poll_status(&self, job: &JobId) -> SolverResult<StatusSnapshot>;

    /// Request cancellation. Takes effect asynchronously, if at all.
    async fn cancel(&self, job: &JobId) -> SolverResult<()>;

    /// Resume submission/polling after a recoverable communication fault.
    async fn retry(&self, job: &JobId) -> SolverResult<()>;

    /// Retrieve the result of a finished job, consuming the backend-side
    /// job resource.
    async fn result(&self, job: &JobId) -> SolverResult<SolveResult>;

    /// Free the backend-side job resource without retrieving a result.
    fn release(&self, job: &JobId);

    /// Heuristically search for an embedding of `problem` into the target
    /// adjacency. Failure does not prove that no embedding exists.
    async fn find_embedding(
        &self,
        problem: &Problem,
        adjacency: &Problem,
        params: &FindEmbeddingParameters,
    ) -> SolverResult<Embedding>;

    /// Embed a problem into the physical topology using a previously found
    /// embedding.
    async fn embed_problem(
        &self,
        problem: &Problem,
        embedding: &Embedding,
        adjacency: &Problem,
        clean: bool,
        smear: bool,
        ranges: IsingRanges,
    ) -> SolverResult<EmbedProblemResult>;

    /// Map physical solutions back onto logical variables, resolving
    /// broken chains with the given policy.
    async fn unembed_answer(
        &self,
        solutions: &[Vec<i8>],
        embedding: &Embedding,
        policy: BrokenChainPolicy,
        problem: &Problem,
    ) -> SolverResult<Vec<Vec<i8>>>;

    /// The solver's coupler graph, as a unit-valued [`Problem`].
    async fn hardware_adjacency(&self) -> SolverResult<Problem>;

    /// Identify variables whose optimal value is known a priori and elide
    /// them from the problem.
    async fn fix_variables(
        &self,
        problem: &Problem,
        method: FixVariablesMethod,
    ) -> SolverResult<FixVariablesResult>;
}
