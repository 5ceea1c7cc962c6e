//! High-level solver handle.

use std::sync::Arc;

use tracing::debug;

use alsvid_model::{Embedding, Problem};

use crate::backend::{IsingRanges, SolverBackend, SolverProperties};
use crate::embed::{BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters};
use crate::error::{SolverError, SolverResult};
use crate::fix::{FixVariablesMethod, FixVariablesResult};
use crate::params::{ProblemKind, SolverKind, SolverParameters};
use crate::result::SolveResult;
use crate::submitted::SubmittedProblem;

/// A handle to one solver on a connection.
///
/// Thin wrapper over a shared [`SolverBackend`]: it validates the request
/// against the solver's capabilities and delegates. Cloning is cheap and
/// clones share the backend.
#[derive(Clone)]
pub struct Solver {
    backend: Arc<dyn SolverBackend>,
}

impl Solver {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn SolverBackend>) -> Self {
        Self { backend }
    }

    /// Name of the solver.
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Category of the solver.
    pub fn kind(&self) -> SolverKind {
        self.backend.kind()
    }

    /// Static solver properties.
    pub fn properties(&self) -> &SolverProperties {
        self.backend.properties()
    }

    /// A parameter set appropriate for this solver's capabilities, at its
    /// default values.
    pub fn new_parameters(&self) -> SolverParameters {
        SolverParameters::default_for(self.backend.kind())
    }

    fn check_request(&self, kind: ProblemKind, params: &SolverParameters) -> SolverResult<()> {
        let props = self.backend.properties();
        if !props.supported_problem_kinds.contains(&kind) {
            return Err(SolverError::Unsupported(format!(
                "solver {} does not accept {kind} problems",
                self.backend.name()
            )));
        }
        if params.kind() != self.backend.kind() {
            return Err(SolverError::InvalidParameter(format!(
                "{:?} parameters passed to a {:?} solver",
                params.kind(),
                self.backend.kind()
            )));
        }
        Ok(())
    }

    /// Solve an Ising problem, waiting for the answer.
    pub async fn solve_ising(
        &self,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        self.check_request(ProblemKind::Ising, params)?;
        self.backend.solve(ProblemKind::Ising, problem, params).await
    }

    /// Solve a QUBO problem, waiting for the answer.
    pub async fn solve_qubo(
        &self,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        self.check_request(ProblemKind::Qubo, params)?;
        self.backend.solve(ProblemKind::Qubo, problem, params).await
    }

    /// Submit an Ising problem for asynchronous solving.
    pub async fn async_solve_ising(
        &self,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SubmittedProblem> {
        self.submit(ProblemKind::Ising, problem, params).await
    }

    /// Submit a QUBO problem for asynchronous solving.
    pub async fn async_solve_qubo(
        &self,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SubmittedProblem> {
        self.submit(ProblemKind::Qubo, problem, params).await
    }

    async fn submit(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SubmittedProblem> {
        self.check_request(kind, params)?;
        let id = self.backend.submit(kind, problem, params).await?;
        debug!(solver = self.backend.name(), job = %id, %kind, "problem submitted");
        Ok(SubmittedProblem::new(Arc::clone(&self.backend), id))
    }

    /// Heuristically search for an embedding of `problem` into `adjacency`.
    pub async fn find_embedding(
        &self,
        problem: &Problem,
        adjacency: &Problem,
        params: &FindEmbeddingParameters,
    ) -> SolverResult<Embedding> {
        self.backend.find_embedding(problem, adjacency, params).await
    }

    /// Embed a problem into the physical topology using a previously found
    /// embedding.
    pub async fn embed_problem(
        &self,
        problem: &Problem,
        embedding: &Embedding,
        adjacency: &Problem,
        clean: bool,
        smear: bool,
        ranges: IsingRanges,
    ) -> SolverResult<EmbedProblemResult> {
        self.backend
            .embed_problem(problem, embedding, adjacency, clean, smear, ranges)
            .await
    }

    /// Map physical solutions back onto logical variables.
    pub async fn unembed_answer(
        &self,
        solutions: &[Vec<i8>],
        embedding: &Embedding,
        policy: BrokenChainPolicy,
        problem: &Problem,
    ) -> SolverResult<Vec<Vec<i8>>> {
        self.backend
            .unembed_answer(solutions, embedding, policy, problem)
            .await
    }

    /// The solver's coupler graph.
    pub async fn hardware_adjacency(&self) -> SolverResult<Problem> {
        self.backend.hardware_adjacency().await
    }

    /// Identify variables whose optimal value is known a priori.
    pub async fn fix_variables(
        &self,
        problem: &Problem,
        method: FixVariablesMethod,
    ) -> SolverResult<FixVariablesResult> {
        self.backend.fix_variables(problem, method).await
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("name", &self.backend.name())
            .field("kind", &self.backend.kind())
            .finish()
    }
}
