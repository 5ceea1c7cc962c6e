//! End-to-end tests driving the software backend through the solver
//! facade: blocking solves, the asynchronous lifecycle, and the
//! embed/solve/unembed round trip.

use std::sync::Arc;
use std::time::Duration;

use alsvid_adapter_sw::SwSolverBackend;
use alsvid_hal::{
    BrokenChainPolicy, FindEmbeddingParameters, IsingRanges, RemoteStatus, Solver, SolverBackend,
    SolverError, SubmittedState, UNUSED_QUBIT,
};
use alsvid_model::{Problem, ProblemEntry};

fn optimizer() -> Solver {
    Solver::new(Arc::new(SwSolverBackend::optimizer()))
}

/// AND gate penalty model on four physical qubits of one Chimera cell:
/// inputs on 0 and 1, output on 5, and 4 chained to 0. Every correct
/// row of the truth table sits at energy -1.75.
fn and_gate() -> Problem {
    Problem::from(vec![
        ProblemEntry::new(0, 0, -0.125),
        ProblemEntry::new(4, 4, -0.125),
        ProblemEntry::new(1, 1, -0.25),
        ProblemEntry::new(5, 5, 0.5),
        ProblemEntry::new(0, 4, -1.0),
        ProblemEntry::new(4, 1, 0.25),
        ProblemEntry::new(1, 5, -0.5),
        ProblemEntry::new(5, 0, -0.5),
    ])
}

#[tokio::test]
async fn optimizer_recovers_the_and_gate_truth_table() {
    let solver = optimizer();
    let mut params = solver.new_parameters();
    params.set_num_reads(16);

    let result = solver.solve_ising(&and_gate(), &params).await.unwrap();
    assert_eq!(result.lowest_energy(), Some(-1.75));

    let ground: Vec<&Vec<i8>> = result
        .solutions
        .iter()
        .zip(&result.energies)
        .filter(|&(_, &e)| e < -1.75 + 1e-9)
        .map(|(s, _)| s)
        .collect();
    // One ground state per input combination.
    assert_eq!(ground.len(), 4);
    for s in ground {
        let (a, a_alt, b, y) = (s[0], s[4], s[1], s[5]);
        assert_eq!(a, a_alt);
        assert_eq!(y > 0, a > 0 && b > 0);
        assert_eq!(s[2], UNUSED_QUBIT);
        assert_eq!(s[3], UNUSED_QUBIT);
    }
}

#[tokio::test]
async fn qubo_ground_states_come_back_first() {
    // One-hot pair: exactly one of x0, x1 should be set.
    let problem = Problem::from(vec![
        ProblemEntry::new(0, 0, -1.0),
        ProblemEntry::new(1, 1, -1.0),
        ProblemEntry::new(0, 1, 2.0),
    ]);
    let solver = optimizer();
    let mut params = solver.new_parameters();
    params.set_num_reads(4);

    let result = solver.solve_qubo(&problem, &params).await.unwrap();
    assert_eq!(result.energies[0], -1.0);
    assert_eq!(result.energies[1], -1.0);
    assert!(result.solutions[..2].contains(&vec![0, 1]));
    assert!(result.solutions[..2].contains(&vec![1, 0]));
}

fn ferromagnet() -> Problem {
    Problem::from(vec![ProblemEntry::new(0, 4, -1.0)])
}

#[tokio::test(start_paused = true)]
async fn async_job_completes_after_the_configured_polls() {
    let solver = Solver::new(Arc::new(
        SwSolverBackend::optimizer().with_polls_to_complete(2),
    ));
    let params = solver.new_parameters();
    let job = solver.async_solve_ising(&ferromagnet(), &params).await.unwrap();

    let st = job.status().await.unwrap();
    assert_eq!(st.state, SubmittedState::Submitted);
    assert_eq!(st.remote_status, RemoteStatus::Pending);
    assert!(st.time_received.is_some());
    assert!(st.time_solved.is_none());

    assert!(job.await_completion(Duration::from_secs(10)).await);
    assert!(job.done());

    let result = job.result().await.unwrap();
    assert_eq!(result.energies[0], -1.0);
}

#[tokio::test]
async fn injected_faults_are_absorbed_by_the_lifecycle() {
    let backend = Arc::new(SwSolverBackend::optimizer());
    backend.inject_fault(SolverError::Network("connection reset".into()));
    let solver = Solver::new(Arc::clone(&backend) as Arc<dyn SolverBackend>);
    let params = solver.new_parameters();
    let job = solver.async_solve_ising(&ferromagnet(), &params).await.unwrap();

    let st = job.status().await.unwrap();
    assert_eq!(st.state, SubmittedState::Retrying);
    assert_eq!(st.last_good_state, SubmittedState::Submitting);

    let st = job.status().await.unwrap();
    assert_eq!(st.state, SubmittedState::Done);
    assert_eq!(st.remote_status, RemoteStatus::Completed);
    assert!(job.result().await.is_ok());
}

#[tokio::test]
async fn canceled_job_reports_problem_canceled() {
    let solver = Solver::new(Arc::new(
        SwSolverBackend::optimizer().with_polls_to_complete(3),
    ));
    let params = solver.new_parameters();
    let job = solver.async_solve_ising(&ferromagnet(), &params).await.unwrap();

    job.cancel().await;
    let st = job.status().await.unwrap();
    assert_eq!(st.state, SubmittedState::Done);
    assert_eq!(st.remote_status, RemoteStatus::Canceled);
    assert!(matches!(
        job.result().await,
        Err(SolverError::ProblemCanceled)
    ));
}

#[tokio::test]
async fn triangle_round_trips_through_an_embedding() {
    // A triangle cannot map 1:1 onto the bipartite Chimera graph, so at
    // least one variable needs a chain.
    let triangle = Problem::from(vec![
        ProblemEntry::new(0, 1, -1.0),
        ProblemEntry::new(1, 2, -1.0),
        ProblemEntry::new(0, 2, -1.0),
    ]);
    let solver = optimizer();
    let adjacency = solver.hardware_adjacency().await.unwrap();

    let mut find_params = FindEmbeddingParameters::default();
    find_params.random_seed = Some(42);
    let embedding = solver
        .find_embedding(&triangle, &adjacency, &find_params)
        .await
        .unwrap();
    assert_eq!(embedding.chains().len(), 3);

    let embedded = solver
        .embed_problem(
            &triangle,
            &embedding,
            &adjacency,
            true,
            false,
            IsingRanges::default(),
        )
        .await
        .unwrap();

    // Chain strength -2.0 keeps chains aligned in the ground state.
    let physical = Problem::from(
        embedded
            .problem
            .iter()
            .copied()
            .chain(
                embedded
                    .chain_couplers
                    .iter()
                    .map(|e| ProblemEntry::new(e.i, e.j, 2.0 * e.value)),
            )
            .collect::<Vec<_>>(),
    );

    let mut params = solver.new_parameters();
    params.set_num_reads(2);
    let result = solver.solve_ising(&physical, &params).await.unwrap();

    let logical = solver
        .unembed_answer(
            &result.solutions,
            &embedded.embedding,
            BrokenChainPolicy::MinimizeEnergy,
            &triangle,
        )
        .await
        .unwrap();

    assert_eq!(logical.len(), 2);
    for row in &logical {
        assert!(row == &vec![1, 1, 1] || row == &vec![-1, -1, -1]);
        assert_eq!(triangle.ising_energy(row), -3.0);
    }
}
