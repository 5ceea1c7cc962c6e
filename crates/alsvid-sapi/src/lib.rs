// SPDX-License-Identifier: Apache-2.0
//! # alsvid-sapi
//!
//! Native integration with the SAPI solver shared library for the Alsvid
//! optimization client.
//!
//! This crate loads the vendor library via `dlopen`, resolves all of its
//! `sapi_*` exports eagerly, and wraps its connections and solvers behind
//! the [`alsvid_hal::SolverBackend`] contract so the rest of the stack
//! never touches a raw pointer.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │    alsvid-hal      │
//!                  │ Solver / jobs      │
//!                  └─────────┬─────────┘
//!                            │ SolverBackend
//!                  ┌─────────┴─────────┐
//!                  │    alsvid-sapi    │
//!                  │                   │
//!                  │  SapiLibrary      │ ← dlopen + eager dlsym
//!                  │  SapiConnection   │ ← RAII connection handle
//!                  │  SapiSolver       │ ← RAII solver + job handles
//!                  │  marshal          │ ← buffer ownership discipline
//!                  └─────────┬─────────┘
//!                            │ C ABI (extern "C")
//!               ┌────────────┴────────────┐
//!               │  SAPI shared library    │
//!               └─────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use alsvid_hal::{Solver, SolverConfig};
//! use alsvid_sapi::{SapiConnection, SapiLibrary};
//!
//! let lib = Arc::new(SapiLibrary::load(Path::new("libdwave_sapi.so"))
//!     .expect("failed to load SAPI library"));
//!
//! let config = SolverConfig::from_env();
//! let conn = Arc::new(SapiConnection::open(lib, &config)
//!     .expect("failed to open connection"));
//!
//! let backend = conn.solver("c4-sw_sample").expect("unknown solver");
//! let solver = Solver::new(Arc::new(backend));
//! println!("{} qubits", solver.properties().num_qubits);
//! ```

pub mod connection;
pub mod error;
pub mod ffi;
pub mod library;
pub mod marshal;

pub use connection::{SapiConnection, SapiSolver};
pub use error::SapiError;
pub use library::SapiLibrary;
pub use marshal::{CoeffBuffer, EmbeddingBuffer, ErrorBuffer, Foreign};
