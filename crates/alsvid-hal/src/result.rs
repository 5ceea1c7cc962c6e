//! Solver output types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Spin value marking a qubit that took no part in the problem.
pub const UNUSED_QUBIT: i8 = 3;

/// Optional timing breakdown reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveTiming {
    /// Wall-clock time from submission to answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Duration>,
    /// Time spent waiting in the backend's queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<Duration>,
    /// Time spent actually solving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<Duration>,
}

/// A solver's output: candidate solutions with energies and tallies.
///
/// `solutions[k][v]` is the value of variable `v` in the k-th solution:
/// ±1 for Ising problems, 0/1 for QUBO problems, [`UNUSED_QUBIT`] for
/// indices the problem never referenced. `energies` and `occurrences` are
/// indexed by solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// Candidate solutions, typically sorted by ascending energy.
    pub solutions: Vec<Vec<i8>>,
    /// Objective value of each solution.
    pub energies: Vec<f64>,
    /// How many reads produced each solution.
    pub occurrences: Vec<usize>,
    /// Timing breakdown, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<SolveTiming>,
}

impl SolveResult {
    /// Number of distinct solutions.
    pub fn num_solutions(&self) -> usize {
        self.solutions.len()
    }

    /// Whether the result holds no solutions.
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// The lowest energy seen, if any solution exists.
    pub fn lowest_energy(&self) -> Option<f64> {
        self.energies.iter().copied().reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_energy_over_unsorted_results() {
        let r = SolveResult {
            solutions: vec![vec![1, -1], vec![-1, -1]],
            energies: vec![0.5, -1.75],
            occurrences: vec![3, 7],
            timing: None,
        };
        assert_eq!(r.num_solutions(), 2);
        assert_eq!(r.lowest_energy(), Some(-1.75));
        assert_eq!(SolveResult::default().lowest_energy(), None);
    }
}
