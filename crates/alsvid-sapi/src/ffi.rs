// SPDX-License-Identifier: Apache-2.0
//! Raw FFI constants and type definitions for the native SAPI solver
//! library.
//!
//! These values must match the SAPI C header definitions. All function
//! pointers are resolved at runtime from the shared library, not linked
//! statically.
//!
//! Memory discipline: every pointer a `sapi_*` function returns through an
//! out-parameter is owned by the library and must be returned to the
//! matching `sapi_free*` function exactly once. The safe wrappers in
//! [`crate::marshal`] encode that contract in `Drop` impls.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

// ===========================================================================
// Opaque handle types
// ===========================================================================

/// Opaque connection handle (`sapi_Connection *`).
pub type SapiConnectionHandle = *mut c_void;

/// Opaque solver handle (`sapi_Solver *`).
pub type SapiSolverHandle = *mut c_void;

/// Opaque submitted-problem handle (`sapi_SubmittedProblem *`).
pub type SapiSubmittedHandle = *mut c_void;

// ===========================================================================
// Status codes (sapi_Code)
// ===========================================================================

pub const SAPI_OK: c_int = 0;
pub const SAPI_ERR_INVALID_PARAMETER: c_int = 1;
pub const SAPI_ERR_SOLVE_FAILED: c_int = 2;
pub const SAPI_ERR_AUTHENTICATION: c_int = 3;
pub const SAPI_ERR_NETWORK: c_int = 4;
pub const SAPI_ERR_COMMUNICATION: c_int = 5;
pub const SAPI_ERR_ASYNC_NOT_DONE: c_int = 6;
pub const SAPI_ERR_PROBLEM_CANCELLED: c_int = 7;
pub const SAPI_ERR_NO_INIT: c_int = 8;
pub const SAPI_ERR_OUT_OF_MEMORY: c_int = 9;

/// Size of the caller-supplied error message buffer, terminator included.
pub const SAPI_ERROR_MESSAGE_MAX_SIZE: usize = 512;

/// Returns `true` if the SAPI return code indicates success.
#[inline]
pub fn is_success(code: c_int) -> bool {
    code == SAPI_OK
}

// ===========================================================================
// Submitted-problem states (sapi_SubmittedState)
// ===========================================================================

pub type SapiSubmittedStateCode = c_int;

pub const SAPI_STATE_SUBMITTING: SapiSubmittedStateCode = 0;
pub const SAPI_STATE_SUBMITTED: SapiSubmittedStateCode = 1;
pub const SAPI_STATE_DONE: SapiSubmittedStateCode = 2;
pub const SAPI_STATE_RETRYING: SapiSubmittedStateCode = 3;
pub const SAPI_STATE_FAILED: SapiSubmittedStateCode = 4;

// ===========================================================================
// Remote problem statuses (sapi_RemoteStatus)
// ===========================================================================

pub type SapiRemoteStatusCode = c_int;

pub const SAPI_REMOTE_STATUS_UNKNOWN: SapiRemoteStatusCode = 0;
pub const SAPI_REMOTE_STATUS_PENDING: SapiRemoteStatusCode = 1;
pub const SAPI_REMOTE_STATUS_IN_PROGRESS: SapiRemoteStatusCode = 2;
pub const SAPI_REMOTE_STATUS_COMPLETED: SapiRemoteStatusCode = 3;
pub const SAPI_REMOTE_STATUS_FAILED: SapiRemoteStatusCode = 4;
pub const SAPI_REMOTE_STATUS_CANCELED: SapiRemoteStatusCode = 5;

// ===========================================================================
// Problem type flags (sapi_SupportedProblemTypes)
// ===========================================================================

pub const SAPI_PROBLEM_TYPE_ISING: c_int = 1 << 0;
pub const SAPI_PROBLEM_TYPE_QUBO: c_int = 1 << 1;

// ===========================================================================
// Data structures
// ===========================================================================

/// One `(i, j, value)` coefficient (`sapi_ProblemEntry`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiProblemEntry {
    pub i: c_int,
    pub j: c_int,
    pub value: f64,
}

/// A sparse problem: a borrowed array of entries (`sapi_Problem`).
///
/// When produced by the library (e.g. `sapi_getHardwareAdjacency`) the
/// elements array is library-owned and must go back through
/// `sapi_freeProblem`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiProblem {
    pub elements: *mut SapiProblemEntry,
    pub len: usize,
}

/// Library-owned solve result (`sapi_IsingResult`).
///
/// `solutions` is a row-major `num_solutions x solution_len` matrix of
/// spin/bit values, with 3 marking an unused variable. Must be freed with
/// `sapi_freeIsingResult` exactly once.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiIsingResult {
    pub solutions: *mut c_int,
    pub energies: *mut f64,
    pub num_occurrences: *mut c_int,
    pub num_solutions: usize,
    pub solution_len: usize,
}

/// Fixed-size identifier / timestamp field length in [`SapiProblemStatus`].
pub const SAPI_STATUS_FIELD_LEN: usize = 64;

/// Status snapshot of a submitted problem (`sapi_ProblemStatus`).
///
/// String fields are NUL-terminated; an empty string means the server has
/// not reported the value yet.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiProblemStatus {
    pub problem_id: [c_char; SAPI_STATUS_FIELD_LEN],
    pub time_received: [c_char; SAPI_STATUS_FIELD_LEN],
    pub time_solved: [c_char; SAPI_STATUS_FIELD_LEN],
    pub state: SapiSubmittedStateCode,
    pub last_good_state: SapiSubmittedStateCode,
    pub remote_status: SapiRemoteStatusCode,
    pub error_code: c_int,
    pub error_message: [c_char; SAPI_ERROR_MESSAGE_MAX_SIZE],
}

/// Coefficient ranges (`sapi_IsingRangeProperties`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiIsingRanges {
    pub h_min: f64,
    pub h_max: f64,
    pub j_min: f64,
    pub j_max: f64,
}

/// Static solver properties (`sapi_SolverProperties`).
///
/// Array fields are library-owned and live as long as the solver handle.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiSolverProperties {
    pub supported_problem_types: c_int,
    pub num_qubits: c_int,
    pub qubits: *const c_int,
    pub qubits_len: usize,
    pub couplers: *const SapiProblemEntry,
    pub couplers_len: usize,
    pub ising_ranges: *const SapiIsingRanges,
}

/// Parameters for the heuristic embedding search
/// (`sapi_FindEmbeddingParameters`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiFindEmbeddingParameters {
    pub fast_embedding: c_int,
    pub max_no_improvement: c_int,
    pub use_random_seed: c_int,
    pub random_seed: u32,
    pub timeout: f64,
    pub tries: c_int,
    pub verbose: c_int,
}

/// Library-owned embedding result: `len` entries mapping physical qubit to
/// logical variable, -1 for unused. Freed with `sapi_freeEmbeddings`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SapiEmbeddings {
    pub elements: *mut c_int,
    pub len: usize,
}

// ===========================================================================
// Function pointer types — SAPI library interface
//
// Every SAPI shared library exports the functions below under exactly these
// names:
//   sapi_globalInit            sapi_freeConnection
//   sapi_globalCleanup         sapi_freeSolver
//   sapi_remoteConnection      sapi_freeProblem
//   sapi_localConnection       sapi_freeIsingResult
//   sapi_getSolver             sapi_freeSubmittedProblem
//   sapi_getSolverProperties   sapi_freeEmbeddings
//   sapi_solveIsing            sapi_asyncSolveIsing
//   sapi_solveQubo             sapi_asyncSolveQubo
//   sapi_asyncStatus           sapi_awaitCompletion
//   sapi_asyncResult           sapi_asyncDone
//   sapi_asyncRetry            sapi_cancelSubmittedProblem
//   sapi_getHardwareAdjacency  sapi_getChimeraAdjacency
//   sapi_findEmbedding         sapi_embedProblem
//   sapi_unembedAnswer         sapi_fixVariables
//   sapi_listSolvers
// ===========================================================================

// -- Library lifecycle --------------------------------------------------------

/// `sapi_Code sapi_globalInit(void)`
pub type FnGlobalInit = unsafe extern "C" fn() -> c_int;

/// `void sapi_globalCleanup(void)`
pub type FnGlobalCleanup = unsafe extern "C" fn();

// -- Connections ----------------------------------------------------------------

/// `sapi_Code sapi_remoteConnection(url, token, proxy, conn_out, err_msg)`
pub type FnRemoteConnection = unsafe extern "C" fn(
    url: *const c_char,
    token: *const c_char,
    proxy: *const c_char,
    conn_out: *mut SapiConnectionHandle,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Connection *sapi_localConnection(void)`
pub type FnLocalConnection = unsafe extern "C" fn() -> SapiConnectionHandle;

/// `void sapi_freeConnection(sapi_Connection *conn)`
pub type FnFreeConnection = unsafe extern "C" fn(conn: SapiConnectionHandle);

/// `const char **sapi_listSolvers(sapi_Connection *conn)`
///
/// Returns a NULL-terminated array of solver names, or NULL on failure.
/// The array and its strings are connection-owned; the caller must not
/// free them.
pub type FnListSolvers =
    unsafe extern "C" fn(conn: SapiConnectionHandle) -> *const *const c_char;

// -- Solvers ---------------------------------------------------------------------

/// `sapi_Solver *sapi_getSolver(conn, solver_name)`
pub type FnGetSolver = unsafe extern "C" fn(
    conn: SapiConnectionHandle,
    solver_name: *const c_char,
) -> SapiSolverHandle;

/// `const sapi_SolverProperties *sapi_getSolverProperties(solver)`
pub type FnGetSolverProperties =
    unsafe extern "C" fn(solver: SapiSolverHandle) -> *const SapiSolverProperties;

/// `void sapi_freeSolver(sapi_Solver *solver)`
pub type FnFreeSolver = unsafe extern "C" fn(solver: SapiSolverHandle);

// -- Synchronous solves ------------------------------------------------------------

/// `sapi_Code sapi_solveIsing(solver, problem, params_json, result_out, err_msg)`
pub type FnSolveIsing = unsafe extern "C" fn(
    solver: SapiSolverHandle,
    problem: *const SapiProblem,
    params_json: *const c_char,
    result_out: *mut *mut SapiIsingResult,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_solveQubo(solver, problem, params_json, result_out, err_msg)`
pub type FnSolveQubo = FnSolveIsing;

// -- Asynchronous solves ------------------------------------------------------------

/// `sapi_Code sapi_asyncSolveIsing(solver, problem, params_json, handle_out, err_msg)`
pub type FnAsyncSolveIsing = unsafe extern "C" fn(
    solver: SapiSolverHandle,
    problem: *const SapiProblem,
    params_json: *const c_char,
    handle_out: *mut SapiSubmittedHandle,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_asyncSolveQubo(...)`, same shape as the Ising variant.
pub type FnAsyncSolveQubo = FnAsyncSolveIsing;

/// `sapi_Code sapi_asyncStatus(handle, status_out)`
pub type FnAsyncStatus = unsafe extern "C" fn(
    handle: SapiSubmittedHandle,
    status_out: *mut SapiProblemStatus,
) -> c_int;

/// `int sapi_asyncDone(handle)`
pub type FnAsyncDone = unsafe extern "C" fn(handle: SapiSubmittedHandle) -> c_int;

/// `int sapi_awaitCompletion(handles, num_handles, min_done, timeout_secs)`
pub type FnAwaitCompletion = unsafe extern "C" fn(
    handles: *const SapiSubmittedHandle,
    num_handles: usize,
    min_done: usize,
    timeout_secs: f64,
) -> c_int;

/// `sapi_Code sapi_asyncResult(handle, result_out, err_msg)`
pub type FnAsyncResult = unsafe extern "C" fn(
    handle: SapiSubmittedHandle,
    result_out: *mut *mut SapiIsingResult,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_asyncRetry(handle)`
pub type FnAsyncRetry = unsafe extern "C" fn(handle: SapiSubmittedHandle) -> c_int;

/// `void sapi_cancelSubmittedProblem(handle)`
pub type FnCancelSubmittedProblem = unsafe extern "C" fn(handle: SapiSubmittedHandle);

/// `void sapi_freeSubmittedProblem(handle)`
pub type FnFreeSubmittedProblem = unsafe extern "C" fn(handle: SapiSubmittedHandle);

// -- Topology and embedding -----------------------------------------------------------

/// `sapi_Code sapi_getHardwareAdjacency(solver, problem_out)`
pub type FnGetHardwareAdjacency = unsafe extern "C" fn(
    solver: SapiSolverHandle,
    problem_out: *mut *mut SapiProblem,
) -> c_int;

/// `sapi_Code sapi_getChimeraAdjacency(m, n, l, problem_out)`
pub type FnGetChimeraAdjacency = unsafe extern "C" fn(
    m: c_int,
    n: c_int,
    l: c_int,
    problem_out: *mut *mut SapiProblem,
) -> c_int;

/// `sapi_Code sapi_findEmbedding(problem, adjacency, params, emb_out, err_msg)`
pub type FnFindEmbedding = unsafe extern "C" fn(
    problem: *const SapiProblem,
    adjacency: *const SapiProblem,
    params: *const SapiFindEmbeddingParameters,
    emb_out: *mut *mut SapiEmbeddings,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_embedProblem(problem, emb, adjacency, clean, smear,
///      ranges, problem_out, chains_out, emb_out, err_msg)`
pub type FnEmbedProblem = unsafe extern "C" fn(
    problem: *const SapiProblem,
    embeddings: *const SapiEmbeddings,
    adjacency: *const SapiProblem,
    clean: c_int,
    smear: c_int,
    ranges: *const SapiIsingRanges,
    problem_out: *mut *mut SapiProblem,
    chains_out: *mut *mut SapiProblem,
    emb_out: *mut *mut SapiEmbeddings,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_unembedAnswer(solutions, solution_len, num_solutions,
///      emb, policy, problem, new_solutions_out, num_new_out, err_msg)`
pub type FnUnembedAnswer = unsafe extern "C" fn(
    solutions: *const c_int,
    solution_len: usize,
    num_solutions: usize,
    embeddings: *const SapiEmbeddings,
    broken_chains: c_int,
    problem: *const SapiProblem,
    new_solutions: *mut c_int,
    num_new_solutions: *mut usize,
    err_msg: *mut c_char,
) -> c_int;

/// `sapi_Code sapi_fixVariables(problem, method, fixed_out, offset_out,
///      new_problem_out, err_msg)`
pub type FnFixVariables = unsafe extern "C" fn(
    problem: *const SapiProblem,
    method: c_int,
    fixed_out: *mut *mut SapiProblem,
    offset_out: *mut f64,
    new_problem_out: *mut *mut SapiProblem,
    err_msg: *mut c_char,
) -> c_int;

// -- Free functions for library-owned buffers ---------------------------------------

/// `void sapi_freeProblem(sapi_Problem *problem)`
pub type FnFreeProblem = unsafe extern "C" fn(problem: *mut SapiProblem);

/// `void sapi_freeIsingResult(sapi_IsingResult *result)`
pub type FnFreeIsingResult = unsafe extern "C" fn(result: *mut SapiIsingResult);

/// `void sapi_freeEmbeddings(sapi_Embeddings *emb)`
pub type FnFreeEmbeddings = unsafe extern "C" fn(emb: *mut SapiEmbeddings);

// ===========================================================================
// Broken-chain policy codes (sapi_BrokenChains)
// ===========================================================================

pub const SAPI_BROKEN_CHAINS_MINIMIZE_ENERGY: c_int = 0;
pub const SAPI_BROKEN_CHAINS_VOTE: c_int = 1;
pub const SAPI_BROKEN_CHAINS_DISCARD: c_int = 2;
pub const SAPI_BROKEN_CHAINS_WEIGHTED_RANDOM: c_int = 3;

// ===========================================================================
// Fix-variables method codes (sapi_FixVariablesMethod)
// ===========================================================================

pub const SAPI_FIX_VARIABLES_METHOD_OPTIMIZED: c_int = 0;
pub const SAPI_FIX_VARIABLES_METHOD_STANDARD: c_int = 1;
