//! In-process software solvers.
//!
//! [`SwSolverBackend`] implements the full backend contract without any
//! native library or network service behind it: an exhaustive optimizer
//! and a seeded random sampler over an emulated Chimera C4 topology, with
//! the embedding and variable-fixing tools implemented in-process. It
//! exists both as a usable small-problem solver and as the reference
//! backend for exercising the job lifecycle in tests.

pub mod backend;
pub mod embed;
pub mod fix;
pub mod solve;

pub use backend::SwSolverBackend;
