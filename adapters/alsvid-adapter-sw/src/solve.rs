//! Solve cores: exhaustive optimization and random sampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use alsvid_hal::{ProblemKind, SolveResult, SolverError, SolverResult, UNUSED_QUBIT};
use alsvid_model::Problem;

/// Largest problem the exhaustive optimizer accepts.
pub const MAX_EXHAUSTIVE_VARIABLES: usize = 24;

/// Variables that actually appear in a problem, sorted.
fn used_variables(problem: &Problem) -> Vec<usize> {
    let mut vars: Vec<usize> = problem
        .iter()
        .flat_map(|e| [e.i, e.j])
        .collect::<rustc_hash::FxHashSet<_>>()
        .into_iter()
        .collect();
    vars.sort_unstable();
    vars
}

fn energy(kind: ProblemKind, problem: &Problem, solution: &[i8]) -> f64 {
    match kind {
        ProblemKind::Ising => problem.ising_energy(solution),
        ProblemKind::Qubo => problem.qubo_energy(solution),
    }
}

fn assignment(kind: ProblemKind, width: usize, vars: &[usize], mask: u64) -> Vec<i8> {
    let mut solution = vec![UNUSED_QUBIT; width];
    for (bit, &v) in vars.iter().enumerate() {
        let set = mask >> bit & 1 == 1;
        solution[v] = match kind {
            ProblemKind::Ising => {
                if set {
                    1
                } else {
                    -1
                }
            }
            ProblemKind::Qubo => i8::from(set),
        };
    }
    solution
}

/// Enumerate every assignment and return the `num_reads` lowest-energy
/// ones, best first.
pub fn optimize(
    kind: ProblemKind,
    problem: &Problem,
    num_reads: usize,
) -> SolverResult<SolveResult> {
    let problem = problem.canonicalize();
    let vars = used_variables(&problem);
    if vars.is_empty() {
        return Ok(SolveResult::default());
    }
    if vars.len() > MAX_EXHAUSTIVE_VARIABLES {
        return Err(SolverError::InvalidParameter(format!(
            "problem has {} variables; the exhaustive optimizer accepts at most {}",
            vars.len(),
            MAX_EXHAUSTIVE_VARIABLES
        )));
    }

    let width = problem.max_variable().map_or(0, |m| m + 1);
    let mut scored: Vec<(f64, Vec<i8>)> = (0..1u64 << vars.len())
        .map(|mask| {
            let solution = assignment(kind, width, &vars, mask);
            (energy(kind, &problem, &solution), solution)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.truncate(num_reads.max(1));

    let mut result = SolveResult::default();
    for (e, s) in scored {
        result.solutions.push(s);
        result.energies.push(e);
        result.occurrences.push(1);
    }
    Ok(result)
}

/// Draw `num_reads` uniform random assignments, merging duplicates into
/// occurrence counts, best energy first.
pub fn sample(
    kind: ProblemKind,
    problem: &Problem,
    num_reads: usize,
    seed: Option<u64>,
) -> SolverResult<SolveResult> {
    let problem = problem.canonicalize();
    let vars = used_variables(&problem);
    if vars.is_empty() {
        return Ok(SolveResult::default());
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let width = problem.max_variable().map_or(0, |m| m + 1);

    let mut counts: FxHashMap<Vec<i8>, usize> = FxHashMap::default();
    for _ in 0..num_reads.max(1) {
        let mut solution = vec![UNUSED_QUBIT; width];
        for &v in &vars {
            let set: bool = rng.r#gen();
            solution[v] = match kind {
                ProblemKind::Ising => {
                    if set {
                        1
                    } else {
                        -1
                    }
                }
                ProblemKind::Qubo => i8::from(set),
            };
        }
        *counts.entry(solution).or_insert(0) += 1;
    }

    let mut scored: Vec<(f64, Vec<i8>, usize)> = counts
        .into_iter()
        .map(|(s, n)| (energy(kind, &problem, &s), s, n))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut result = SolveResult::default();
    for (e, s, n) in scored {
        result.solutions.push(s);
        result.energies.push(e);
        result.occurrences.push(n);
    }
    Ok(result)
}
