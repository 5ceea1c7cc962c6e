//! Alsvid problem model
//!
//! Sparse symmetric coefficient representation of quadratic optimization
//! problems, shared by every Alsvid backend. A [`Problem`] is an ordered list
//! of [`ProblemEntry`] coefficients and may encode either a QUBO objective
//! (binary variables in {0, 1}) or an Ising objective (spin variables in
//! {−1, +1}); the two encodings are related by the affine substitution
//! `s = 2x − 1` and are interconvertible without loss via [`Problem::to_ising`]
//! and [`Problem::to_qubo`].
//!
//! Everything in this crate is pure data manipulation: no I/O, no backend
//! calls, and every operation is safe for unrestricted concurrent use.
//!
//! # Example
//!
//! ```
//! use alsvid_model::{Problem, ProblemEntry};
//!
//! // h_0 = h_1 = 1, J_01 = −1
//! let ising: Problem = [
//!     ProblemEntry::new(0, 0, 1.0),
//!     ProblemEntry::new(1, 1, 1.0),
//!     ProblemEntry::new(0, 1, -1.0),
//! ]
//! .into_iter()
//! .collect();
//!
//! let (qubo, offset) = ising.to_qubo();
//! assert_eq!(offset, -3.0);
//! assert_eq!(qubo.num_variables(), 2);
//! ```

pub mod embedding;
pub mod problem;
pub mod topology;

pub use embedding::{Embedding, UNUSED};
pub use problem::{Problem, ProblemEntry};
pub use topology::chimera_adjacency;
