//! Software solver backend implementation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tracing::debug;
use uuid::Uuid;

use alsvid_hal::{
    BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters, FixVariablesMethod,
    FixVariablesResult, IsingRanges, JobId, ProblemKind, RemoteStatus, SolveResult, SolverBackend,
    SolverError, SolverKind, SolverParameters, SolverProperties, SolverResult, StatusSnapshot,
};
use alsvid_model::{Embedding, Problem, chimera_adjacency};

use crate::{embed, fix, solve};

/// Chimera dimensions of the emulated topology.
const CHIMERA_M: usize = 4;
const CHIMERA_N: usize = 4;
const CHIMERA_L: usize = 4;

/// Job data for a software solver.
struct SwJob {
    result: SolveResult,
    time_received: DateTime<Utc>,
    time_solved: Option<DateTime<Utc>>,
    /// Remaining polls before the job reports `Completed`.
    polls_remaining: u32,
    canceled: bool,
}

/// In-process solver backend.
///
/// Jobs complete after a configurable number of status polls so lifecycle
/// behavior is deterministic under test. Recoverable faults can be
/// injected ahead of status polls with [`inject_fault`].
///
/// [`inject_fault`]: SwSolverBackend::inject_fault
pub struct SwSolverBackend {
    name: String,
    kind: SolverKind,
    properties: SolverProperties,
    adjacency: Problem,
    jobs: Arc<Mutex<FxHashMap<String, SwJob>>>,
    faults: Mutex<VecDeque<SolverError>>,
    polls_to_complete: u32,
}

impl SwSolverBackend {
    /// The exhaustive optimizer, mirroring the `c4-sw_optimize` solver.
    pub fn optimizer() -> Self {
        Self::new("c4-sw_optimize", SolverKind::SwOptimize)
    }

    /// The random sampler, mirroring the `c4-sw_sample` solver.
    pub fn sampler() -> Self {
        Self::new("c4-sw_sample", SolverKind::SwSample)
    }

    fn new(name: &str, kind: SolverKind) -> Self {
        let adjacency = chimera_adjacency(CHIMERA_M, CHIMERA_N, CHIMERA_L);
        let couplers: Vec<(usize, usize)> = adjacency.iter().map(|e| (e.i, e.j)).collect();
        let num_qubits = 2 * CHIMERA_M * CHIMERA_N * CHIMERA_L;
        Self {
            name: name.to_string(),
            kind,
            properties: SolverProperties {
                supported_problem_kinds: vec![ProblemKind::Ising, ProblemKind::Qubo],
                num_qubits,
                qubits: (0..num_qubits).collect(),
                couplers,
                ising_ranges: None,
            },
            adjacency,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            faults: Mutex::new(VecDeque::new()),
            polls_to_complete: 0,
        }
    }

    /// Require `polls` status polls before a job reports `Completed`.
    pub fn with_polls_to_complete(mut self, polls: u32) -> Self {
        self.polls_to_complete = polls;
        self
    }

    /// Queue an error to be returned by the next status poll.
    pub fn inject_fault(&self, error: SolverError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    fn run(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        let num_reads = params.num_reads();
        match params {
            SolverParameters::SwOptimize(_) => solve::optimize(kind, problem, num_reads),
            SolverParameters::SwSample(p) => solve::sample(kind, problem, num_reads, p.random_seed),
            other => Err(SolverError::InvalidParameter(format!(
                "{:?} parameters passed to the {} solver",
                other.kind(),
                self.name
            ))),
        }
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, SwJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SolverBackend for SwSolverBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SolverKind {
        self.kind
    }

    fn properties(&self) -> &SolverProperties {
        &self.properties
    }

    async fn solve(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        self.run(kind, problem, params)
    }

    async fn submit(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<JobId> {
        // The answer is computed up front; the poll countdown only shapes
        // the observable lifecycle.
        let result = self.run(kind, problem, params)?;
        let id = JobId::new(Uuid::new_v4().to_string());
        self.lock_jobs().insert(
            id.to_string(),
            SwJob {
                result,
                time_received: Utc::now(),
                time_solved: None,
                polls_remaining: self.polls_to_complete,
                canceled: false,
            },
        );
        debug!(solver = %self.name, job = %id, %kind, "job accepted");
        Ok(id)
    }

    async fn poll_status(&self, job: &JobId) -> SolverResult<StatusSnapshot> {
        if let Some(fault) = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            return Err(fault);
        }

        let mut jobs = self.lock_jobs();
        let sw_job = jobs
            .get_mut(job.as_str())
            .ok_or_else(|| SolverError::InvalidParameter(format!("unknown job {job}")))?;

        let remote_status = if sw_job.canceled {
            RemoteStatus::Canceled
        } else if sw_job.polls_remaining == 0 {
            if sw_job.time_solved.is_none() {
                sw_job.time_solved = Some(Utc::now());
            }
            RemoteStatus::Completed
        } else {
            sw_job.polls_remaining -= 1;
            if sw_job.polls_remaining == self.polls_to_complete.saturating_sub(1) {
                RemoteStatus::Pending
            } else {
                RemoteStatus::InProgress
            }
        };

        Ok(StatusSnapshot {
            id: job.clone(),
            remote_status,
            time_received: Some(sw_job.time_received),
            time_solved: sw_job.time_solved,
            error: None,
        })
    }

    async fn cancel(&self, job: &JobId) -> SolverResult<()> {
        let mut jobs = self.lock_jobs();
        let sw_job = jobs
            .get_mut(job.as_str())
            .ok_or_else(|| SolverError::InvalidParameter(format!("unknown job {job}")))?;
        if sw_job.time_solved.is_none() {
            sw_job.canceled = true;
        }
        Ok(())
    }

    async fn retry(&self, _job: &JobId) -> SolverResult<()> {
        Ok(())
    }

    async fn result(&self, job: &JobId) -> SolverResult<SolveResult> {
        let mut jobs = self.lock_jobs();
        let sw_job = jobs
            .get(job.as_str())
            .ok_or_else(|| SolverError::InvalidParameter(format!("unknown job {job}")))?;
        if sw_job.canceled {
            return Err(SolverError::ProblemCanceled);
        }
        if sw_job.time_solved.is_none() && sw_job.polls_remaining > 0 {
            return Err(SolverError::AsyncNotDone("job is still running".into()));
        }
        // Success consumes the job.
        let sw_job = jobs.remove(job.as_str()).ok_or(SolverError::ProblemCanceled)?;
        Ok(sw_job.result)
    }

    fn release(&self, job: &JobId) {
        if self.lock_jobs().remove(job.as_str()).is_some() {
            debug!(solver = %self.name, job = %job, "released job");
        }
    }

    async fn find_embedding(
        &self,
        problem: &Problem,
        adjacency: &Problem,
        params: &FindEmbeddingParameters,
    ) -> SolverResult<Embedding> {
        embed::find_embedding(problem, adjacency, params.tries, params.random_seed)
    }

    async fn embed_problem(
        &self,
        problem: &Problem,
        embedding: &Embedding,
        adjacency: &Problem,
        clean: bool,
        _smear: bool,
        _ranges: IsingRanges,
    ) -> SolverResult<EmbedProblemResult> {
        embed::embed_problem(problem, embedding, adjacency, clean)
    }

    async fn unembed_answer(
        &self,
        solutions: &[Vec<i8>],
        embedding: &Embedding,
        policy: BrokenChainPolicy,
        problem: &Problem,
    ) -> SolverResult<Vec<Vec<i8>>> {
        embed::unembed_answer(solutions, embedding, policy, problem)
    }

    async fn hardware_adjacency(&self) -> SolverResult<Problem> {
        Ok(self.adjacency.clone())
    }

    async fn fix_variables(
        &self,
        problem: &Problem,
        method: FixVariablesMethod,
    ) -> SolverResult<FixVariablesResult> {
        Ok(fix::fix_variables(problem, method))
    }
}

impl std::fmt::Debug for SwSolverBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwSolverBackend")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
