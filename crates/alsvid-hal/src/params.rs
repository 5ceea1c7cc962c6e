//! Solver parameter sets.
//!
//! Each solver kind accepts a different parameter block. The original
//! vendor API selected the block by matching solver-name suffixes; here the
//! variant is chosen by the kind the backend itself reports
//! ([`SolverParameters::default_for`]), which is robust against renamed
//! solvers.

use serde::{Deserialize, Serialize};

/// The encoding of a submitted problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemKind {
    /// Spin variables in {−1, +1}.
    Ising,
    /// Binary variables in {0, 1}.
    Qubo,
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemKind::Ising => write!(f, "ising"),
            ProblemKind::Qubo => write!(f, "qubo"),
        }
    }
}

/// The category of solver behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    /// Quantum annealing hardware.
    Quantum,
    /// Software sampler.
    SwSample,
    /// Software exhaustive/greedy optimizer.
    SwOptimize,
    /// Software heuristic solver.
    SwHeuristic,
}

/// Parameters for quantum annealing hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumParams {
    /// Number of reads (anneal/readout cycles) to take.
    pub num_reads: usize,
    /// Annealing time in microseconds.
    pub annealing_time_us: u32,
    /// Automatically scale coefficients into the hardware range.
    pub auto_scale: bool,
    /// Number of spin-reversal transforms to apply.
    pub num_spin_reversal_transforms: usize,
}

impl Default for QuantumParams {
    fn default() -> Self {
        Self {
            num_reads: 1,
            annealing_time_us: 20,
            auto_scale: true,
            num_spin_reversal_transforms: 0,
        }
    }
}

/// Parameters for a sampling software solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwSampleParams {
    /// Number of samples to draw.
    pub num_reads: usize,
    /// Seed for the sampler's random number generator.
    pub random_seed: Option<u64>,
}

impl Default for SwSampleParams {
    fn default() -> Self {
        Self {
            num_reads: 1,
            random_seed: None,
        }
    }
}

/// Parameters for an optimizing software solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwOptimizeParams {
    /// Number of lowest-energy answers to return.
    pub num_reads: usize,
}

impl Default for SwOptimizeParams {
    fn default() -> Self {
        Self { num_reads: 1 }
    }
}

/// Parameters for a heuristic software solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwHeuristicParams {
    /// Maximum number of improvement rounds.
    pub iteration_limit: usize,
    /// Seed for the solver's random number generator.
    pub random_seed: Option<u64>,
}

impl Default for SwHeuristicParams {
    fn default() -> Self {
        Self {
            iteration_limit: 10,
            random_seed: None,
        }
    }
}

/// Tagged parameter set over the solver kinds.
///
/// The common setters mirror the original interface: setting a field a
/// variant does not carry is a documented no-op, so generic submission code
/// can configure any solver uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverParameters {
    /// Quantum annealing hardware.
    Quantum(QuantumParams),
    /// Software sampler.
    SwSample(SwSampleParams),
    /// Software optimizer.
    SwOptimize(SwOptimizeParams),
    /// Software heuristic solver.
    SwHeuristic(SwHeuristicParams),
}

impl SolverParameters {
    /// Default parameter set for a solver of the given kind.
    pub fn default_for(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Quantum => SolverParameters::Quantum(QuantumParams::default()),
            SolverKind::SwSample => SolverParameters::SwSample(SwSampleParams::default()),
            SolverKind::SwOptimize => SolverParameters::SwOptimize(SwOptimizeParams::default()),
            SolverKind::SwHeuristic => SolverParameters::SwHeuristic(SwHeuristicParams::default()),
        }
    }

    /// The solver kind this parameter set belongs to.
    pub fn kind(&self) -> SolverKind {
        match self {
            SolverParameters::Quantum(_) => SolverKind::Quantum,
            SolverParameters::SwSample(_) => SolverKind::SwSample,
            SolverParameters::SwOptimize(_) => SolverKind::SwOptimize,
            SolverParameters::SwHeuristic(_) => SolverKind::SwHeuristic,
        }
    }

    /// Number of reads/answers requested. Heuristic solvers always return
    /// a single answer.
    pub fn num_reads(&self) -> usize {
        match self {
            SolverParameters::Quantum(p) => p.num_reads,
            SolverParameters::SwSample(p) => p.num_reads,
            SolverParameters::SwOptimize(p) => p.num_reads,
            SolverParameters::SwHeuristic(_) => 1,
        }
    }

    /// Set the number of reads to take. No-op for heuristic solvers.
    pub fn set_num_reads(&mut self, num_reads: usize) {
        match self {
            SolverParameters::Quantum(p) => p.num_reads = num_reads,
            SolverParameters::SwSample(p) => p.num_reads = num_reads,
            SolverParameters::SwOptimize(p) => p.num_reads = num_reads,
            SolverParameters::SwHeuristic(_) => {}
        }
    }

    /// Set the annealing time in microseconds. Only quantum solvers use it.
    pub fn set_annealing_time_us(&mut self, us: u32) {
        if let SolverParameters::Quantum(p) = self {
            p.annealing_time_us = us;
        }
    }

    /// Enable or disable coefficient auto-scaling. Only quantum solvers
    /// use it.
    pub fn set_auto_scale(&mut self, auto_scale: bool) {
        if let SolverParameters::Quantum(p) = self {
            p.auto_scale = auto_scale;
        }
    }

    /// Set the number of spin-reversal transforms. Only quantum solvers
    /// use it.
    pub fn set_num_spin_reversal_transforms(&mut self, n: usize) {
        if let SolverParameters::Quantum(p) = self {
            p.num_spin_reversal_transforms = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_is_keyed_on_solver_kind() {
        for kind in [
            SolverKind::Quantum,
            SolverKind::SwSample,
            SolverKind::SwOptimize,
            SolverKind::SwHeuristic,
        ] {
            assert_eq!(SolverParameters::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn common_setters_ignore_missing_fields() {
        let mut p = SolverParameters::default_for(SolverKind::SwHeuristic);
        p.set_num_reads(500);
        p.set_annealing_time_us(100);
        assert_eq!(p.num_reads(), 1);

        let mut q = SolverParameters::default_for(SolverKind::Quantum);
        q.set_num_reads(500);
        q.set_auto_scale(false);
        match q {
            SolverParameters::Quantum(ref qp) => {
                assert_eq!(qp.num_reads, 500);
                assert!(!qp.auto_scale);
            }
            _ => unreachable!(),
        }
    }
}
