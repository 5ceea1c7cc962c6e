//! Embedding collaborator types.
//!
//! The embedding search and the unembedding post-processing run inside the
//! backend; these types describe the requests and results that cross that
//! boundary.

use serde::{Deserialize, Serialize};

use alsvid_model::{Embedding, Problem};

/// Parameters for the heuristic embedding search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindEmbeddingParameters {
    /// Find any embedding quickly, without minimizing chain length.
    pub fast_embedding: bool,
    /// Rounds to keep trying from the current solution with no improvement.
    pub max_no_improvement: usize,
    /// Seed for the search's random number generator.
    pub random_seed: Option<u64>,
    /// Give up after this many seconds.
    pub timeout_secs: f64,
    /// Give up after this many restart attempts.
    pub tries: usize,
    /// Emit verbose progress information.
    pub verbose: bool,
}

impl Default for FindEmbeddingParameters {
    fn default() -> Self {
        Self {
            fast_embedding: false,
            max_no_improvement: 10,
            random_seed: None,
            timeout_secs: 1000.0,
            tries: 10,
            verbose: false,
        }
    }
}

/// Result of embedding a problem into a physical topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedProblemResult {
    /// The original problem mapped onto physical qubits.
    pub problem: Problem,
    /// Chain couplers: edges binding the physical qubits that represent one
    /// logical variable. Values are placeholders; the caller picks the
    /// chain strength.
    pub chain_couplers: Problem,
    /// The embedding actually used, possibly modified by cleaning or
    /// smearing.
    pub embedding: Embedding,
}

/// How to resolve a chain whose physical qubits disagree after solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokenChainPolicy {
    /// Pick the value that minimizes the resulting energy.
    MinimizeEnergy,
    /// Majority vote across the chain.
    Vote,
    /// Drop solutions containing broken chains.
    Discard,
    /// Pick randomly, weighted by the chain's vote split.
    WeightedRandom,
}
