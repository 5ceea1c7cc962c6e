//! Job lifecycle tests against a scripted in-memory backend.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use alsvid_hal::{
    BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters, FixVariablesMethod,
    FixVariablesResult, IsingRanges, JobId, ProblemKind, RemoteStatus, SolveResult, Solver,
    SolverBackend, SolverError, SolverKind, SolverParameters, SolverProperties, SolverResult,
    StatusSnapshot, SubmittedProblem, SubmittedState, await_completion,
};
use alsvid_model::{Embedding, Problem, ProblemEntry};

/// A backend whose poll results are scripted up front. Once the script is
/// exhausted every poll reports `fallback`.
struct MockBackend {
    properties: SolverProperties,
    polls: Mutex<VecDeque<SolverResult<RemoteStatus>>>,
    fallback: RemoteStatus,
    releases: AtomicUsize,
    retries: AtomicUsize,
    cancels: AtomicUsize,
}

impl MockBackend {
    fn new(script: Vec<SolverResult<RemoteStatus>>, fallback: RemoteStatus) -> Arc<Self> {
        Arc::new(Self {
            properties: SolverProperties {
                supported_problem_kinds: vec![ProblemKind::Ising, ProblemKind::Qubo],
                num_qubits: 4,
                qubits: vec![0, 1, 2, 3],
                couplers: vec![(0, 1), (1, 2), (2, 3)],
                ising_ranges: Some(IsingRanges::default()),
            },
            polls: Mutex::new(script.into()),
            fallback,
            releases: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        })
    }

    fn trivial_result() -> SolveResult {
        SolveResult {
            solutions: vec![vec![1, -1]],
            energies: vec![-1.0],
            occurrences: vec![1],
            timing: None,
        }
    }
}

#[async_trait]
impl SolverBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> SolverKind {
        SolverKind::SwSample
    }

    fn properties(&self) -> &SolverProperties {
        &self.properties
    }

    async fn solve(
        &self,
        _kind: ProblemKind,
        _problem: &Problem,
        _params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        Ok(Self::trivial_result())
    }

    async fn submit(
        &self,
        _kind: ProblemKind,
        _problem: &Problem,
        _params: &SolverParameters,
    ) -> SolverResult<JobId> {
        Ok(JobId::from("mock-job-1"))
    }

    async fn poll_status(&self, job: &JobId) -> SolverResult<StatusSnapshot> {
        let next = self
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback));
        let remote_status = next?;
        Ok(StatusSnapshot {
            id: job.clone(),
            remote_status,
            time_received: (remote_status != RemoteStatus::Unknown).then(Utc::now),
            time_solved: remote_status.is_terminal().then(Utc::now),
            error: (remote_status == RemoteStatus::Failed).then(|| "boom".to_string()),
        })
    }

    async fn cancel(&self, _job: &JobId) -> SolverResult<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn retry(&self, _job: &JobId) -> SolverResult<()> {
        self.retries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn result(&self, _job: &JobId) -> SolverResult<SolveResult> {
        Ok(Self::trivial_result())
    }

    fn release(&self, _job: &JobId) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    async fn find_embedding(
        &self,
        _problem: &Problem,
        _adjacency: &Problem,
        _params: &FindEmbeddingParameters,
    ) -> SolverResult<Embedding> {
        Err(SolverError::Unsupported("find_embedding".into()))
    }

    async fn embed_problem(
        &self,
        _problem: &Problem,
        _embedding: &Embedding,
        _adjacency: &Problem,
        _clean: bool,
        _smear: bool,
        _ranges: IsingRanges,
    ) -> SolverResult<EmbedProblemResult> {
        Err(SolverError::Unsupported("embed_problem".into()))
    }

    async fn unembed_answer(
        &self,
        _solutions: &[Vec<i8>],
        _embedding: &Embedding,
        _policy: BrokenChainPolicy,
        _problem: &Problem,
    ) -> SolverResult<Vec<Vec<i8>>> {
        Err(SolverError::Unsupported("unembed_answer".into()))
    }

    async fn hardware_adjacency(&self) -> SolverResult<Problem> {
        Ok(Problem::new())
    }

    async fn fix_variables(
        &self,
        _problem: &Problem,
        _method: FixVariablesMethod,
    ) -> SolverResult<FixVariablesResult> {
        Err(SolverError::Unsupported("fix_variables".into()))
    }
}

fn job_on(backend: &Arc<MockBackend>) -> SubmittedProblem {
    SubmittedProblem::new(
        Arc::clone(backend) as Arc<dyn SolverBackend>,
        JobId::from("mock-job-1"),
    )
}

#[tokio::test]
async fn status_progresses_to_done() {
    let backend = MockBackend::new(
        vec![
            Ok(RemoteStatus::Pending),
            Ok(RemoteStatus::InProgress),
            Ok(RemoteStatus::Completed),
        ],
        RemoteStatus::Completed,
    );
    let job = job_on(&backend);

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Submitted);
    assert_eq!(s.remote_status, RemoteStatus::Pending);
    assert!(s.time_received.is_some());
    assert!(s.time_solved.is_none());
    assert!(!job.done());

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Submitted);
    assert_eq!(s.remote_status, RemoteStatus::InProgress);

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Done);
    assert_eq!(s.last_good_state, SubmittedState::Done);
    assert!(s.time_solved.is_some());
    assert!(job.done());
}

#[tokio::test]
async fn unknown_status_stays_submitting() {
    let backend = MockBackend::new(vec![Ok(RemoteStatus::Unknown)], RemoteStatus::Pending);
    let job = job_on(&backend);
    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Submitting);
    assert!(s.time_received.is_none());
}

#[tokio::test(start_paused = true)]
async fn await_completion_returns_true_once_done() {
    let backend = MockBackend::new(
        vec![Ok(RemoteStatus::Pending), Ok(RemoteStatus::InProgress)],
        RemoteStatus::Completed,
    );
    let job = job_on(&backend);
    assert!(job.await_completion(Duration::from_secs(30)).await);
    assert!(job.done());
    assert_eq!(job.status().await.unwrap().state, SubmittedState::Done);
}

#[tokio::test(start_paused = true)]
async fn await_completion_times_out_while_pending() {
    let backend = MockBackend::new(vec![], RemoteStatus::Pending);
    let job = job_on(&backend);
    assert!(!job.await_completion(Duration::from_secs(2)).await);
    assert!(!job.done());
    // A later call can still succeed.
    backend
        .polls
        .lock()
        .unwrap()
        .push_back(Ok(RemoteStatus::Completed));
    assert!(job.await_completion(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn recoverable_faults_are_absorbed_until_budget_runs_out() {
    let backend = MockBackend::new(
        vec![
            Ok(RemoteStatus::InProgress),
            Err(SolverError::Network("connection reset".into())),
            Err(SolverError::Network("connection reset".into())),
        ],
        RemoteStatus::InProgress,
    );
    let job = SubmittedProblem::with_retry_budget(
        Arc::clone(&backend) as Arc<dyn SolverBackend>,
        JobId::from("mock-job-1"),
        1,
    );

    assert_eq!(job.status().await.unwrap().state, SubmittedState::Submitted);

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Retrying);
    assert_eq!(s.last_good_state, SubmittedState::Submitted);
    assert!(matches!(s.error, Some(SolverError::Network(_))));

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Failed);
    assert_eq!(s.last_good_state, SubmittedState::Submitted);

    // Retry restores the last good state and the budget.
    job.retry().await;
    assert_eq!(backend.retries.load(Ordering::SeqCst), 1);
    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Submitted);
    assert!(s.error.is_none());
}

#[tokio::test]
async fn successful_poll_restores_the_retry_budget() {
    let backend = MockBackend::new(
        vec![
            Err(SolverError::Communication("timeout".into())),
            Ok(RemoteStatus::InProgress),
            Err(SolverError::Communication("timeout".into())),
        ],
        RemoteStatus::InProgress,
    );
    let job = SubmittedProblem::with_retry_budget(
        Arc::clone(&backend) as Arc<dyn SolverBackend>,
        JobId::from("mock-job-1"),
        1,
    );

    assert_eq!(job.status().await.unwrap().state, SubmittedState::Retrying);
    assert_eq!(job.status().await.unwrap().state, SubmittedState::Submitted);
    // Budget was restored, so the next fault retries instead of failing.
    assert_eq!(job.status().await.unwrap().state, SubmittedState::Retrying);
}

#[tokio::test]
async fn retry_is_a_noop_outside_fault_states() {
    let backend = MockBackend::new(vec![Ok(RemoteStatus::Pending)], RemoteStatus::Pending);
    let job = job_on(&backend);
    job.status().await.unwrap();
    job.retry().await;
    assert_eq!(backend.retries.load(Ordering::SeqCst), 0);
    assert_eq!(job.status().await.unwrap().state, SubmittedState::Submitted);
}

#[tokio::test]
async fn non_recoverable_errors_propagate() {
    let backend = MockBackend::new(
        vec![Err(SolverError::InvalidParameter("bad id".into()))],
        RemoteStatus::Pending,
    );
    let job = job_on(&backend);
    let err = job.status().await.unwrap_err();
    assert_eq!(err, SolverError::InvalidParameter("bad id".into()));
}

#[tokio::test]
async fn result_is_gated_and_consumed_once() {
    let backend = MockBackend::new(vec![Ok(RemoteStatus::Pending)], RemoteStatus::Completed);
    let job = job_on(&backend);

    job.status().await.unwrap();
    let err = job.result().await.unwrap_err();
    assert!(matches!(err, SolverError::AsyncNotDone(_)));

    job.status().await.unwrap();
    assert!(job.done());
    let result = job.result().await.unwrap();
    assert_eq!(result.num_solutions(), 1);

    let err = job.result().await.unwrap_err();
    assert_eq!(
        err,
        SolverError::AsyncNotDone("result already consumed".into())
    );

    drop(job);
    // Consuming the result released the backend resource; Drop must not
    // release it again.
    assert_eq!(backend.releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropping_an_unconsumed_job_releases_it() {
    let backend = MockBackend::new(vec![], RemoteStatus::Completed);
    let job = job_on(&backend);
    drop(job);
    assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn canceled_job_reaches_done_but_yields_no_result() {
    let backend = MockBackend::new(vec![Ok(RemoteStatus::Canceled)], RemoteStatus::Canceled);
    let job = job_on(&backend);

    job.cancel().await;
    assert_eq!(backend.cancels.load(Ordering::SeqCst), 1);

    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Done);
    assert_eq!(s.remote_status, RemoteStatus::Canceled);
    assert_eq!(job.result().await.unwrap_err(), SolverError::ProblemCanceled);
}

#[tokio::test]
async fn failed_job_reports_the_server_error() {
    let backend = MockBackend::new(vec![Ok(RemoteStatus::Failed)], RemoteStatus::Failed);
    let job = job_on(&backend);
    let s = job.status().await.unwrap();
    assert_eq!(s.state, SubmittedState::Done);
    assert_eq!(
        job.result().await.unwrap_err(),
        SolverError::SolveFailed("boom".into())
    );
}

#[tokio::test(start_paused = true)]
async fn multi_job_await_honors_the_threshold() {
    let fast = MockBackend::new(vec![], RemoteStatus::Completed);
    let slow = MockBackend::new(vec![], RemoteStatus::InProgress);
    let a = job_on(&fast);
    let b = job_on(&fast);
    let c = job_on(&slow);

    assert!(await_completion(&[&a, &b, &c], 2, Duration::from_secs(5)).await);
    assert!(a.done());
    assert!(b.done());
    assert!(!await_completion(&[&c], 1, Duration::from_secs(2)).await);
}

#[tokio::test(start_paused = true)]
async fn multi_job_await_clamps_the_threshold() {
    let backend = MockBackend::new(vec![], RemoteStatus::Completed);
    let a = job_on(&backend);

    // Empty set is trivially satisfied.
    assert!(await_completion(&[], 3, Duration::from_secs(1)).await);
    // min_done of 0 still waits for one job; 10 is capped at the set size.
    assert!(await_completion(&[&a], 0, Duration::from_secs(5)).await);
    assert!(await_completion(&[&a], 10, Duration::from_secs(5)).await);
}

#[tokio::test]
async fn solver_facade_validates_and_submits() {
    let backend = MockBackend::new(vec![], RemoteStatus::Completed);
    let solver = Solver::new(Arc::clone(&backend) as Arc<dyn SolverBackend>);

    assert_eq!(solver.kind(), SolverKind::SwSample);
    let params = solver.new_parameters();
    assert_eq!(params.kind(), SolverKind::SwSample);

    let problem = Problem::from(vec![ProblemEntry::new(0, 1, -1.0)]);
    let job = solver.async_solve_ising(&problem, &params).await.unwrap();
    assert!(job.await_completion(Duration::from_secs(5)).await);
    assert_eq!(job.result().await.unwrap().energies, vec![-1.0]);

    let wrong = SolverParameters::default_for(SolverKind::Quantum);
    let err = solver.solve_ising(&problem, &wrong).await.unwrap_err();
    assert!(matches!(err, SolverError::InvalidParameter(_)));
}
