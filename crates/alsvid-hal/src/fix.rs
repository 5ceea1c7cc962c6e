//! Variable-fixing (roof duality) collaborator types.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use alsvid_model::Problem;

/// How aggressively to search for variables with a provably fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixVariablesMethod {
    /// Roof duality plus strongly-connected-component analysis.
    Optimized,
    /// Roof duality only.
    Standard,
}

/// Variables that can be removed from a problem because their value in all
/// optimal solutions is known a priori.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixVariablesResult {
    /// Fixed variables and their values (0 or 1).
    pub fixed: FxHashMap<usize, i8>,
    /// Energy difference between the reduced and original problems.
    pub offset: f64,
    /// The reduced problem, containing no fixed variables.
    pub reduced: Problem,
}
