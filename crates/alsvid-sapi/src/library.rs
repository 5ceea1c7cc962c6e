// SPDX-License-Identifier: Apache-2.0
//! Load the SAPI shared library and resolve its symbols.
//!
//! This module handles the `dlopen` + `dlsym` dance. All symbols are
//! resolved eagerly at load time so a missing export surfaces as a load
//! error instead of a panic deep inside a solve.

use std::path::Path;
use std::sync::OnceLock;

use libloading::{Library, Symbol};

use crate::error::{Result, SapiError};
use crate::ffi;

/// A loaded SAPI library with all function pointers resolved.
///
/// The library handle is kept alive for the lifetime of this struct so the
/// loaded `.so` is not unloaded while we still hold function pointers into
/// it.
pub struct SapiLibrary {
    /// Prevent the shared library from being unloaded.
    _library: Library,

    /// Path the library was loaded from (for diagnostics).
    library_path: String,

    /// `sapi_globalInit` outcome, recorded once.
    init: OnceLock<i32>,

    // -- Library lifecycle -----------------------------------------------------
    pub(crate) fn_global_init: ffi::FnGlobalInit,
    pub(crate) fn_global_cleanup: ffi::FnGlobalCleanup,

    // -- Connections -----------------------------------------------------------
    pub(crate) fn_remote_connection: ffi::FnRemoteConnection,
    pub(crate) fn_local_connection: ffi::FnLocalConnection,
    pub(crate) fn_free_connection: ffi::FnFreeConnection,
    pub(crate) fn_list_solvers: ffi::FnListSolvers,

    // -- Solvers ---------------------------------------------------------------
    pub(crate) fn_get_solver: ffi::FnGetSolver,
    pub(crate) fn_get_solver_properties: ffi::FnGetSolverProperties,
    pub(crate) fn_free_solver: ffi::FnFreeSolver,

    // -- Solves ------------------------------------------------------------------
    pub(crate) fn_solve_ising: ffi::FnSolveIsing,
    pub(crate) fn_solve_qubo: ffi::FnSolveQubo,
    pub(crate) fn_async_solve_ising: ffi::FnAsyncSolveIsing,
    pub(crate) fn_async_solve_qubo: ffi::FnAsyncSolveQubo,
    pub(crate) fn_async_status: ffi::FnAsyncStatus,
    #[allow(dead_code)]
    pub(crate) fn_async_done: ffi::FnAsyncDone,
    #[allow(dead_code)]
    pub(crate) fn_await_completion: ffi::FnAwaitCompletion,
    pub(crate) fn_async_result: ffi::FnAsyncResult,
    pub(crate) fn_async_retry: ffi::FnAsyncRetry,
    pub(crate) fn_cancel_submitted_problem: ffi::FnCancelSubmittedProblem,
    pub(crate) fn_free_submitted_problem: ffi::FnFreeSubmittedProblem,

    // -- Topology and embedding ---------------------------------------------------
    pub(crate) fn_get_hardware_adjacency: ffi::FnGetHardwareAdjacency,
    #[allow(dead_code)]
    pub(crate) fn_get_chimera_adjacency: ffi::FnGetChimeraAdjacency,
    pub(crate) fn_find_embedding: ffi::FnFindEmbedding,
    pub(crate) fn_embed_problem: ffi::FnEmbedProblem,
    pub(crate) fn_unembed_answer: ffi::FnUnembedAnswer,
    pub(crate) fn_fix_variables: ffi::FnFixVariables,

    // -- Free functions -------------------------------------------------------------
    pub(crate) fn_free_problem: ffi::FnFreeProblem,
    pub(crate) fn_free_ising_result: ffi::FnFreeIsingResult,
    pub(crate) fn_free_embeddings: ffi::FnFreeEmbeddings,
}

impl SapiLibrary {
    /// Load the SAPI shared library and resolve all function pointers.
    ///
    /// Loading does not initialize the library; call [`initialize`] before
    /// opening connections.
    ///
    /// # Errors
    ///
    /// Returns [`SapiError::LoadFailed`] if `dlopen` fails, or
    /// [`SapiError::SymbolNotFound`] if a required symbol cannot be
    /// resolved.
    ///
    /// [`initialize`]: SapiLibrary::initialize
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();

        // SAFETY: we are loading an external shared library. The caller is
        // responsible for ensuring the library is trustworthy.
        let library = unsafe { Library::new(path) }.map_err(|e| SapiError::LoadFailed {
            path: path_str.clone(),
            cause: e.to_string(),
        })?;

        tracing::info!("loaded SAPI library '{path_str}'");

        macro_rules! resolve {
            ($name:literal as $ty:ty) => {
                resolve_symbol::<$ty>(&library, $name)?
            };
        }

        Ok(Self {
            fn_global_init: resolve!("sapi_globalInit" as ffi::FnGlobalInit),
            fn_global_cleanup: resolve!("sapi_globalCleanup" as ffi::FnGlobalCleanup),
            fn_remote_connection: resolve!("sapi_remoteConnection" as ffi::FnRemoteConnection),
            fn_local_connection: resolve!("sapi_localConnection" as ffi::FnLocalConnection),
            fn_free_connection: resolve!("sapi_freeConnection" as ffi::FnFreeConnection),
            fn_list_solvers: resolve!("sapi_listSolvers" as ffi::FnListSolvers),
            fn_get_solver: resolve!("sapi_getSolver" as ffi::FnGetSolver),
            fn_get_solver_properties: resolve!(
                "sapi_getSolverProperties" as ffi::FnGetSolverProperties
            ),
            fn_free_solver: resolve!("sapi_freeSolver" as ffi::FnFreeSolver),
            fn_solve_ising: resolve!("sapi_solveIsing" as ffi::FnSolveIsing),
            fn_solve_qubo: resolve!("sapi_solveQubo" as ffi::FnSolveQubo),
            fn_async_solve_ising: resolve!("sapi_asyncSolveIsing" as ffi::FnAsyncSolveIsing),
            fn_async_solve_qubo: resolve!("sapi_asyncSolveQubo" as ffi::FnAsyncSolveQubo),
            fn_async_status: resolve!("sapi_asyncStatus" as ffi::FnAsyncStatus),
            fn_async_done: resolve!("sapi_asyncDone" as ffi::FnAsyncDone),
            fn_await_completion: resolve!("sapi_awaitCompletion" as ffi::FnAwaitCompletion),
            fn_async_result: resolve!("sapi_asyncResult" as ffi::FnAsyncResult),
            fn_async_retry: resolve!("sapi_asyncRetry" as ffi::FnAsyncRetry),
            fn_cancel_submitted_problem: resolve!(
                "sapi_cancelSubmittedProblem" as ffi::FnCancelSubmittedProblem
            ),
            fn_free_submitted_problem: resolve!(
                "sapi_freeSubmittedProblem" as ffi::FnFreeSubmittedProblem
            ),
            fn_get_hardware_adjacency: resolve!(
                "sapi_getHardwareAdjacency" as ffi::FnGetHardwareAdjacency
            ),
            fn_get_chimera_adjacency: resolve!(
                "sapi_getChimeraAdjacency" as ffi::FnGetChimeraAdjacency
            ),
            fn_find_embedding: resolve!("sapi_findEmbedding" as ffi::FnFindEmbedding),
            fn_embed_problem: resolve!("sapi_embedProblem" as ffi::FnEmbedProblem),
            fn_unembed_answer: resolve!("sapi_unembedAnswer" as ffi::FnUnembedAnswer),
            fn_fix_variables: resolve!("sapi_fixVariables" as ffi::FnFixVariables),
            fn_free_problem: resolve!("sapi_freeProblem" as ffi::FnFreeProblem),
            fn_free_ising_result: resolve!("sapi_freeIsingResult" as ffi::FnFreeIsingResult),
            fn_free_embeddings: resolve!("sapi_freeEmbeddings" as ffi::FnFreeEmbeddings),
            _library: library,
            library_path: path_str,
            init: OnceLock::new(),
        })
    }

    /// Initialize the library. Idempotent: `sapi_globalInit` runs once and
    /// its outcome is replayed on later calls.
    pub fn initialize(&self) -> Result<()> {
        let code = *self.init.get_or_init(|| {
            let code = unsafe { (self.fn_global_init)() };
            if ffi::is_success(code) {
                tracing::debug!("SAPI library '{}' initialized", self.library_path);
            }
            code
        });
        if ffi::is_success(code) {
            Ok(())
        } else {
            Err(SapiError::InitFailed(code))
        }
    }

    /// Whether [`initialize`](SapiLibrary::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.init.get().is_some_and(|code| ffi::is_success(*code))
    }

    /// Filesystem path the library was loaded from.
    pub fn library_path(&self) -> &str {
        &self.library_path
    }
}

impl Drop for SapiLibrary {
    fn drop(&mut self) {
        if self.is_initialized() {
            unsafe { (self.fn_global_cleanup)() };
            tracing::debug!("SAPI library '{}' cleaned up", self.library_path);
        }
    }
}

impl std::fmt::Debug for SapiLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SapiLibrary")
            .field("library_path", &self.library_path)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Resolve a required symbol. Returns an error if the symbol is missing.
fn resolve_symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    tracing::trace!("resolving symbol '{name}'");

    // SAFETY: The caller guarantees the type `T` matches the actual function
    // signature exported by the library. This is the core FFI contract.
    unsafe {
        let sym: Symbol<'_, T> =
            library
                .get(name.as_bytes())
                .map_err(|e| SapiError::SymbolNotFound {
                    symbol: name.to_string(),
                    cause: e.to_string(),
                })?;
        Ok(*sym)
    }
}
