// SPDX-License-Identifier: Apache-2.0
//! Connections and solvers backed by the native SAPI library.
//!
//! A [`SapiConnection`] wraps a `sapi_Connection *` (remote or local); a
//! [`SapiSolver`] wraps one `sapi_Solver *` on it and implements
//! [`SolverBackend`] for the job lifecycle in `alsvid-hal`.
//!
//! The SAPI library does not document thread-safety for its handles, so
//! every call on a solver goes through a per-solver mutex. The FFI calls
//! themselves are blocking; polling calls return quickly, and the
//! synchronous solve entry points block the calling task by design.

use std::ffi::CString;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use alsvid_hal::{
    BrokenChainPolicy, EmbedProblemResult, FindEmbeddingParameters, FixVariablesMethod,
    FixVariablesResult, IsingRanges, JobId, ProblemKind, SolveResult, SolverBackend, SolverConfig,
    SolverError, SolverKind, SolverParameters, SolverProperties, SolverResult, StatusSnapshot,
};
use alsvid_model::{Embedding, Problem};

use crate::error::{Result, SapiError};
use crate::ffi;
use crate::library::SapiLibrary;
use crate::marshal::{
    CoeffBuffer, EmbeddingBuffer, ErrorBuffer, Foreign, embedding_from_raw, names_from_raw,
    problem_from_raw, result_from_raw, snapshot_from_raw,
};

/// An open connection to a solving service.
pub struct SapiConnection {
    lib: Arc<SapiLibrary>,
    handle: ffi::SapiConnectionHandle,
    remote: bool,
}

// SAFETY: the raw connection handle is only dereferenced by the SAPI
// library, and every call that passes it is serialized behind the solver
// call gates created from this connection.
unsafe impl Send for SapiConnection {}
unsafe impl Sync for SapiConnection {}

impl SapiConnection {
    /// Open a connection according to the configuration: remote when both
    /// endpoint and token are set, local otherwise.
    pub fn open(lib: Arc<SapiLibrary>, config: &SolverConfig) -> Result<Self> {
        if config.is_remote() {
            Self::remote(lib, config)
        } else {
            Self::local(lib)
        }
    }

    /// Open a remote connection.
    pub fn remote(lib: Arc<SapiLibrary>, config: &SolverConfig) -> Result<Self> {
        lib.initialize()?;

        let url = CString::new(config.endpoint.clone().unwrap_or_default())?;
        let token = CString::new(config.token.clone().unwrap_or_default())?;
        let proxy = config.proxy.clone().map(CString::new).transpose()?;

        let mut handle: ffi::SapiConnectionHandle = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        // SAFETY: all pointers are valid for the duration of the call; the
        // library copies what it keeps.
        let code = unsafe {
            (lib.fn_remote_connection)(
                url.as_ptr(),
                token.as_ptr(),
                proxy.as_ref().map_or(std::ptr::null(), |p| p.as_ptr()),
                &mut handle,
                err.as_mut_ptr(),
            )
        };
        if !ffi::is_success(code) {
            return Err(err.into_error(code));
        }
        if handle.is_null() {
            return Err(SapiError::Communication(
                "remote connection returned null handle".into(),
            ));
        }
        debug!(url = %config.endpoint.as_deref().unwrap_or(""), "opened remote SAPI connection");
        Ok(Self {
            lib,
            handle,
            remote: true,
        })
    }

    /// Open the built-in local connection (software solvers only).
    pub fn local(lib: Arc<SapiLibrary>) -> Result<Self> {
        lib.initialize()?;

        // SAFETY: takes no arguments; returns a library-owned handle.
        let handle = unsafe { (lib.fn_local_connection)() };
        if handle.is_null() {
            return Err(SapiError::Communication(
                "local connection returned null handle".into(),
            ));
        }
        debug!("opened local SAPI connection");
        Ok(Self {
            lib,
            handle,
            remote: false,
        })
    }

    /// Whether this is a remote (network) connection.
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// List the names of the solvers available on this connection.
    pub fn solvers(&self) -> Result<Vec<String>> {
        // SAFETY: connection handle is live; the returned list and its
        // strings stay owned by the connection, so nothing here is freed.
        let list = unsafe { (self.lib.fn_list_solvers)(self.handle) };
        if list.is_null() {
            return Err(SapiError::Communication(
                "failed to retrieve the solver list".into(),
            ));
        }
        // SAFETY: the list is NULL-terminated per the library contract.
        Ok(unsafe { names_from_raw(list) })
    }

    /// Look up a solver by name and cache its properties.
    pub fn solver(self: &Arc<Self>, name: &str) -> Result<SapiSolver> {
        let c_name = CString::new(name)?;
        // SAFETY: connection handle is live; the name is copied by the
        // library.
        let handle = unsafe { (self.lib.fn_get_solver)(self.handle, c_name.as_ptr()) };
        if handle.is_null() {
            return Err(SapiError::UnknownSolver(name.to_string()));
        }

        // SAFETY: solver handle is live; properties stay valid as long as
        // the solver handle does, and we copy them out immediately.
        let props_ptr = unsafe { (self.lib.fn_get_solver_properties)(handle) };
        if props_ptr.is_null() {
            unsafe { (self.lib.fn_free_solver)(handle) };
            return Err(SapiError::Communication(format!(
                "solver '{name}' reported no properties"
            )));
        }
        let properties = unsafe { properties_from_raw(&*props_ptr) };

        debug!(
            solver = name,
            qubits = properties.num_qubits,
            "opened SAPI solver"
        );
        Ok(SapiSolver {
            lib: Arc::clone(&self.lib),
            _conn: Arc::clone(self),
            handle,
            name: name.to_string(),
            kind: kind_from_name(name),
            properties,
            call_gate: Mutex::new(()),
            jobs: Mutex::new(FxHashMap::default()),
        })
    }
}

impl Drop for SapiConnection {
    fn drop(&mut self) {
        // SAFETY: the handle is live and freed exactly once here; solvers
        // hold an Arc to the connection so they are already gone.
        unsafe { (self.lib.fn_free_connection)(self.handle) };
    }
}

impl std::fmt::Debug for SapiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SapiConnection")
            .field("remote", &self.remote)
            .field("library", &self.lib.library_path())
            .finish_non_exhaustive()
    }
}

/// One solver on a SAPI connection, usable as a [`SolverBackend`].
pub struct SapiSolver {
    lib: Arc<SapiLibrary>,
    _conn: Arc<SapiConnection>,
    handle: ffi::SapiSolverHandle,
    name: String,
    kind: SolverKind,
    properties: SolverProperties,
    /// Serializes every FFI call on this solver and its job handles.
    call_gate: Mutex<()>,
    /// Live submitted-problem handles keyed by client job id.
    jobs: Mutex<FxHashMap<String, ffi::SapiSubmittedHandle>>,
}

// SAFETY: the raw handles are only passed back to the SAPI library, and
// every such call holds `call_gate`.
unsafe impl Send for SapiSolver {}
unsafe impl Sync for SapiSolver {}

impl SapiSolver {
    fn gate(&self) -> std::sync::MutexGuard<'_, ()> {
        self.call_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn job_handle(&self, job: &JobId) -> SolverResult<ffi::SapiSubmittedHandle> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job.as_str())
            .copied()
            .ok_or_else(|| SolverError::InvalidParameter(format!("unknown job {job}")))
    }

    fn take_job_handle(&self, job: &JobId) -> Option<ffi::SapiSubmittedHandle> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job.as_str())
    }

    fn params_json(params: &SolverParameters) -> SolverResult<CString> {
        let json = serde_json::to_string(params)
            .map_err(|e| SolverError::InvalidParameter(e.to_string()))?;
        CString::new(json).map_err(|e| SolverError::InvalidParameter(e.to_string()))
    }

    fn solve_blocking(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        let coeffs = CoeffBuffer::marshal(problem)?;
        let raw_problem = coeffs.as_sapi();
        let params_json = Self::params_json(params)?;
        let solve_fn = match kind {
            ProblemKind::Ising => self.lib.fn_solve_ising,
            ProblemKind::Qubo => self.lib.fn_solve_qubo,
        };

        let mut result_ptr: *mut ffi::SapiIsingResult = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        let _gate = self.gate();
        // SAFETY: all in-pointers are valid for the call; result_ptr is
        // library-owned on success and wrapped for exactly-once freeing.
        let code = unsafe {
            solve_fn(
                self.handle,
                &raw_problem,
                params_json.as_ptr(),
                &mut result_ptr,
                err.as_mut_ptr(),
            )
        };
        if !ffi::is_success(code) {
            return Err(err.into_error(code).into());
        }
        let owned = Foreign::new(result_ptr, self.lib.fn_free_ising_result).ok_or_else(|| {
            SolverError::Communication("solve returned success but no result".into())
        })?;
        Ok(result_from_raw(owned.as_ref()))
    }
}

#[async_trait]
impl SolverBackend for SapiSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SolverKind {
        self.kind
    }

    fn properties(&self) -> &SolverProperties {
        &self.properties
    }

    async fn solve(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<SolveResult> {
        self.solve_blocking(kind, problem, params)
    }

    async fn submit(
        &self,
        kind: ProblemKind,
        problem: &Problem,
        params: &SolverParameters,
    ) -> SolverResult<JobId> {
        let coeffs = CoeffBuffer::marshal(problem)?;
        let raw_problem = coeffs.as_sapi();
        let params_json = Self::params_json(params)?;
        let submit_fn = match kind {
            ProblemKind::Ising => self.lib.fn_async_solve_ising,
            ProblemKind::Qubo => self.lib.fn_async_solve_qubo,
        };

        let mut handle: ffi::SapiSubmittedHandle = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: in-pointers are valid for the call; on success the
            // submitted-problem handle is owned by us until freed.
            unsafe {
                submit_fn(
                    self.handle,
                    &raw_problem,
                    params_json.as_ptr(),
                    &mut handle,
                    err.as_mut_ptr(),
                )
            }
        };
        if !ffi::is_success(code) {
            return Err(err.into_error(code).into());
        }
        if handle.is_null() {
            return Err(SolverError::Communication(
                "submit returned success but no handle".into(),
            ));
        }

        let id = JobId::new(Uuid::new_v4().to_string());
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), handle);
        debug!(solver = %self.name, job = %id, "submitted problem");
        Ok(id)
    }

    async fn poll_status(&self, job: &JobId) -> SolverResult<StatusSnapshot> {
        let handle = self.job_handle(job)?;
        let mut raw = ffi::SapiProblemStatus {
            problem_id: [0; ffi::SAPI_STATUS_FIELD_LEN],
            time_received: [0; ffi::SAPI_STATUS_FIELD_LEN],
            time_solved: [0; ffi::SAPI_STATUS_FIELD_LEN],
            state: ffi::SAPI_STATE_SUBMITTING,
            last_good_state: ffi::SAPI_STATE_SUBMITTING,
            remote_status: ffi::SAPI_REMOTE_STATUS_UNKNOWN,
            error_code: ffi::SAPI_OK,
            error_message: [0; ffi::SAPI_ERROR_MESSAGE_MAX_SIZE],
        };
        let code = {
            let _gate = self.gate();
            // SAFETY: handle is a live submitted-problem handle; raw is a
            // valid out-parameter.
            unsafe { (self.lib.fn_async_status)(handle, &mut raw) }
        };
        if !ffi::is_success(code) {
            return Err(SapiError::from_code(code, String::new()).into());
        }

        let mut snap = snapshot_from_raw(&raw);
        // Keep the client-side id; the server-side id lives in the snapshot
        // only until the server assigns one.
        if snap.id.as_str().is_empty() {
            snap.id = job.clone();
        }
        Ok(snap)
    }

    async fn cancel(&self, job: &JobId) -> SolverResult<()> {
        let handle = self.job_handle(job)?;
        let _gate = self.gate();
        // SAFETY: handle is live; cancellation is fire-and-forget.
        unsafe { (self.lib.fn_cancel_submitted_problem)(handle) };
        Ok(())
    }

    async fn retry(&self, job: &JobId) -> SolverResult<()> {
        let handle = self.job_handle(job)?;
        let code = {
            let _gate = self.gate();
            // SAFETY: handle is live.
            unsafe { (self.lib.fn_async_retry)(handle) }
        };
        if !ffi::is_success(code) {
            return Err(SapiError::from_code(code, String::new()).into());
        }
        Ok(())
    }

    async fn result(&self, job: &JobId) -> SolverResult<SolveResult> {
        let handle = self.job_handle(job)?;
        let mut result_ptr: *mut ffi::SapiIsingResult = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: handle is live; result_ptr is library-owned on
            // success.
            unsafe { (self.lib.fn_async_result)(handle, &mut result_ptr, err.as_mut_ptr()) }
        };
        if !ffi::is_success(code) {
            // The job handle stays alive so the caller can retry or release.
            return Err(err.into_error(code).into());
        }
        let owned = Foreign::new(result_ptr, self.lib.fn_free_ising_result).ok_or_else(|| {
            SolverError::Communication("result returned success but no data".into())
        })?;
        let result = result_from_raw(owned.as_ref());

        // Success consumes the backend job resource.
        if let Some(handle) = self.take_job_handle(job) {
            let _gate = self.gate();
            // SAFETY: handle was removed from the map, so this is the only
            // free.
            unsafe { (self.lib.fn_free_submitted_problem)(handle) };
        }
        Ok(result)
    }

    fn release(&self, job: &JobId) {
        if let Some(handle) = self.take_job_handle(job) {
            let _gate = self.gate();
            // SAFETY: handle was removed from the map, so this is the only
            // free.
            unsafe { (self.lib.fn_free_submitted_problem)(handle) };
            debug!(solver = %self.name, job = %job, "released job");
        }
    }

    async fn find_embedding(
        &self,
        problem: &Problem,
        adjacency: &Problem,
        params: &FindEmbeddingParameters,
    ) -> SolverResult<Embedding> {
        let p = CoeffBuffer::marshal(problem)?;
        let a = CoeffBuffer::marshal(adjacency)?;
        let raw_p = p.as_sapi();
        let raw_a = a.as_sapi();
        let raw_params = embedding_params_raw(params)?;

        let mut emb_ptr: *mut ffi::SapiEmbeddings = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: all in-pointers are valid for the call.
            unsafe {
                (self.lib.fn_find_embedding)(
                    &raw_p,
                    &raw_a,
                    &raw_params,
                    &mut emb_ptr,
                    err.as_mut_ptr(),
                )
            }
        };
        if !ffi::is_success(code) {
            return Err(err.into_error(code).into());
        }
        let owned = Foreign::new(emb_ptr, self.lib.fn_free_embeddings).ok_or_else(|| {
            SolverError::Communication("find_embedding returned success but no data".into())
        })?;
        Ok(embedding_from_raw(owned.as_ref()))
    }

    async fn embed_problem(
        &self,
        problem: &Problem,
        embedding: &Embedding,
        adjacency: &Problem,
        clean: bool,
        smear: bool,
        ranges: IsingRanges,
    ) -> SolverResult<EmbedProblemResult> {
        let p = CoeffBuffer::marshal(problem)?;
        let e = EmbeddingBuffer::marshal(embedding)?;
        let a = CoeffBuffer::marshal(adjacency)?;
        let raw_p = p.as_sapi();
        let raw_e = e.as_sapi();
        let raw_a = a.as_sapi();
        let raw_ranges = ffi::SapiIsingRanges {
            h_min: ranges.h_min,
            h_max: ranges.h_max,
            j_min: ranges.j_min,
            j_max: ranges.j_max,
        };

        let mut problem_ptr: *mut ffi::SapiProblem = std::ptr::null_mut();
        let mut chains_ptr: *mut ffi::SapiProblem = std::ptr::null_mut();
        let mut emb_ptr: *mut ffi::SapiEmbeddings = std::ptr::null_mut();
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: all in-pointers are valid for the call; out-pointers
            // are library-owned on success.
            unsafe {
                (self.lib.fn_embed_problem)(
                    &raw_p,
                    &raw_e,
                    &raw_a,
                    clean.into(),
                    smear.into(),
                    &raw_ranges,
                    &mut problem_ptr,
                    &mut chains_ptr,
                    &mut emb_ptr,
                    err.as_mut_ptr(),
                )
            }
        };
        if !ffi::is_success(code) {
            // Wrap whatever did come back so partial outputs are still
            // freed.
            let _ = Foreign::new(problem_ptr, self.lib.fn_free_problem);
            let _ = Foreign::new(chains_ptr, self.lib.fn_free_problem);
            let _ = Foreign::new(emb_ptr, self.lib.fn_free_embeddings);
            return Err(err.into_error(code).into());
        }

        let owned_problem = Foreign::new(problem_ptr, self.lib.fn_free_problem);
        let owned_chains = Foreign::new(chains_ptr, self.lib.fn_free_problem);
        let owned_emb = Foreign::new(emb_ptr, self.lib.fn_free_embeddings);
        Ok(EmbedProblemResult {
            problem: owned_problem
                .as_ref()
                .map(|p| problem_from_raw(p.as_ref()))
                .unwrap_or_default(),
            chain_couplers: owned_chains
                .as_ref()
                .map(|p| problem_from_raw(p.as_ref()))
                .unwrap_or_default(),
            embedding: owned_emb
                .as_ref()
                .map(|e| embedding_from_raw(e.as_ref()))
                .unwrap_or_else(|| Embedding::from(Vec::new())),
        })
    }

    async fn unembed_answer(
        &self,
        solutions: &[Vec<i8>],
        embedding: &Embedding,
        policy: BrokenChainPolicy,
        problem: &Problem,
    ) -> SolverResult<Vec<Vec<i8>>> {
        let solution_len = solutions.first().map_or(0, Vec::len);
        let flat: Vec<std::os::raw::c_int> = solutions
            .iter()
            .flat_map(|row| row.iter().map(|&v| std::os::raw::c_int::from(v)))
            .collect();

        let e = EmbeddingBuffer::marshal(embedding)?;
        let p = CoeffBuffer::marshal(problem)?;
        let raw_e = e.as_sapi();
        let raw_p = p.as_sapi();

        let logical_len = embedding.0.iter().copied().max().map_or(0, |m| {
            usize::try_from(m + 1).unwrap_or(0)
        });
        let mut out = vec![0 as std::os::raw::c_int; solutions.len() * logical_len];
        let mut num_new: usize = 0;
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: out is sized for the worst case (every solution
            // kept); the library writes num_new rows.
            unsafe {
                (self.lib.fn_unembed_answer)(
                    flat.as_ptr(),
                    solution_len,
                    solutions.len(),
                    &raw_e,
                    broken_chains_code(policy),
                    &raw_p,
                    out.as_mut_ptr(),
                    &mut num_new,
                    err.as_mut_ptr(),
                )
            }
        };
        if !ffi::is_success(code) {
            return Err(err.into_error(code).into());
        }

        out.truncate(num_new * logical_len);
        Ok(out
            .chunks_exact(logical_len.max(1))
            .map(|row| row.iter().map(|&v| v as i8).collect())
            .collect())
    }

    async fn hardware_adjacency(&self) -> SolverResult<Problem> {
        let mut problem_ptr: *mut ffi::SapiProblem = std::ptr::null_mut();
        let code = {
            let _gate = self.gate();
            // SAFETY: solver handle is live; problem_ptr is library-owned
            // on success.
            unsafe { (self.lib.fn_get_hardware_adjacency)(self.handle, &mut problem_ptr) }
        };
        if !ffi::is_success(code) {
            return Err(SapiError::from_code(code, String::new()).into());
        }
        let owned = Foreign::new(problem_ptr, self.lib.fn_free_problem).ok_or_else(|| {
            SolverError::Communication("adjacency returned success but no data".into())
        })?;
        Ok(problem_from_raw(owned.as_ref()))
    }

    async fn fix_variables(
        &self,
        problem: &Problem,
        method: FixVariablesMethod,
    ) -> SolverResult<FixVariablesResult> {
        let p = CoeffBuffer::marshal(problem)?;
        let raw_p = p.as_sapi();
        let raw_method = match method {
            FixVariablesMethod::Optimized => ffi::SAPI_FIX_VARIABLES_METHOD_OPTIMIZED,
            FixVariablesMethod::Standard => ffi::SAPI_FIX_VARIABLES_METHOD_STANDARD,
        };

        let mut fixed_ptr: *mut ffi::SapiProblem = std::ptr::null_mut();
        let mut reduced_ptr: *mut ffi::SapiProblem = std::ptr::null_mut();
        let mut offset = 0.0f64;
        let mut err = ErrorBuffer::new();
        let code = {
            let _gate = self.gate();
            // SAFETY: in-pointers valid for the call; out-pointers are
            // library-owned on success.
            unsafe {
                (self.lib.fn_fix_variables)(
                    &raw_p,
                    raw_method,
                    &mut fixed_ptr,
                    &mut offset,
                    &mut reduced_ptr,
                    err.as_mut_ptr(),
                )
            }
        };
        if !ffi::is_success(code) {
            let _ = Foreign::new(fixed_ptr, self.lib.fn_free_problem);
            let _ = Foreign::new(reduced_ptr, self.lib.fn_free_problem);
            return Err(err.into_error(code).into());
        }

        let fixed = Foreign::new(fixed_ptr, self.lib.fn_free_problem)
            .map(|p| problem_from_raw(p.as_ref()))
            .unwrap_or_default();
        let reduced = Foreign::new(reduced_ptr, self.lib.fn_free_problem)
            .map(|p| problem_from_raw(p.as_ref()))
            .unwrap_or_default();

        // Fixed variables come back as diagonal (i, i, value) entries.
        Ok(FixVariablesResult {
            fixed: fixed
                .iter()
                .map(|entry| (entry.i, entry.value as i8))
                .collect(),
            offset,
            reduced,
        })
    }
}

impl Drop for SapiSolver {
    fn drop(&mut self) {
        let jobs = self.jobs.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !jobs.is_empty() {
            warn!(
                solver = %self.name,
                count = jobs.len(),
                "solver dropped with live jobs"
            );
        }
        for (_, handle) in jobs.drain() {
            // SAFETY: each handle is freed exactly once; the map was the
            // sole owner.
            unsafe { (self.lib.fn_free_submitted_problem)(handle) };
        }
        // SAFETY: handle is live and freed exactly once here.
        unsafe { (self.lib.fn_free_solver)(self.handle) };
    }
}

impl std::fmt::Debug for SapiSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SapiSolver")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn kind_from_name(name: &str) -> SolverKind {
    if name.contains("sw_optimize") {
        SolverKind::SwOptimize
    } else if name.contains("sw_sample") {
        SolverKind::SwSample
    } else if name.contains("heuristic") {
        SolverKind::SwHeuristic
    } else {
        SolverKind::Quantum
    }
}

fn broken_chains_code(policy: BrokenChainPolicy) -> std::os::raw::c_int {
    match policy {
        BrokenChainPolicy::MinimizeEnergy => ffi::SAPI_BROKEN_CHAINS_MINIMIZE_ENERGY,
        BrokenChainPolicy::Vote => ffi::SAPI_BROKEN_CHAINS_VOTE,
        BrokenChainPolicy::Discard => ffi::SAPI_BROKEN_CHAINS_DISCARD,
        BrokenChainPolicy::WeightedRandom => ffi::SAPI_BROKEN_CHAINS_WEIGHTED_RANDOM,
    }
}

fn clamp_c_int(value: usize) -> std::os::raw::c_int {
    std::os::raw::c_int::try_from(value).unwrap_or(std::os::raw::c_int::MAX)
}

/// Marshal embedding-search parameters into the C struct. The library's
/// seed field is 32-bit; wider seeds are rejected rather than truncated.
fn embedding_params_raw(
    params: &FindEmbeddingParameters,
) -> SolverResult<ffi::SapiFindEmbeddingParameters> {
    let random_seed = params
        .random_seed
        .map(u32::try_from)
        .transpose()
        .map_err(|_| {
            SolverError::InvalidParameter(
                "random_seed exceeds the 32-bit range the embedding search accepts".into(),
            )
        })?;
    Ok(ffi::SapiFindEmbeddingParameters {
        fast_embedding: params.fast_embedding.into(),
        max_no_improvement: clamp_c_int(params.max_no_improvement),
        use_random_seed: random_seed.is_some().into(),
        random_seed: random_seed.unwrap_or(0),
        timeout: params.timeout_secs,
        tries: clamp_c_int(params.tries),
        verbose: params.verbose.into(),
    })
}

/// Copy library-owned solver properties into owned form.
///
/// # Safety
///
/// All array pointers in `raw` must be valid for their stated lengths.
unsafe fn properties_from_raw(raw: &ffi::SapiSolverProperties) -> SolverProperties {
    let mut supported_problem_kinds = Vec::new();
    if raw.supported_problem_types & ffi::SAPI_PROBLEM_TYPE_ISING != 0 {
        supported_problem_kinds.push(ProblemKind::Ising);
    }
    if raw.supported_problem_types & ffi::SAPI_PROBLEM_TYPE_QUBO != 0 {
        supported_problem_kinds.push(ProblemKind::Qubo);
    }

    let qubits = if raw.qubits.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(raw.qubits, raw.qubits_len) }
            .iter()
            .map(|&q| q.max(0) as usize)
            .collect()
    };

    let couplers = if raw.couplers.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(raw.couplers, raw.couplers_len) }
            .iter()
            .map(|c| (c.i.max(0) as usize, c.j.max(0) as usize))
            .collect()
    };

    let ising_ranges = if raw.ising_ranges.is_null() {
        None
    } else {
        let r = unsafe { &*raw.ising_ranges };
        Some(IsingRanges {
            h_min: r.h_min,
            h_max: r.h_max,
            j_min: r.j_min,
            j_max: r.j_max,
        })
    };

    SolverProperties {
        supported_problem_kinds,
        num_qubits: raw.num_qubits.max(0) as usize,
        qubits,
        couplers,
        ising_ranges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_seed_is_passed_through() {
        let mut params = FindEmbeddingParameters::default();
        params.random_seed = Some(42);
        let raw = embedding_params_raw(&params).unwrap();
        assert_eq!(raw.use_random_seed, 1);
        assert_eq!(raw.random_seed, 42);

        params.random_seed = None;
        let raw = embedding_params_raw(&params).unwrap();
        assert_eq!(raw.use_random_seed, 0);
        assert_eq!(raw.random_seed, 0);
    }

    #[test]
    fn oversized_embedding_seed_is_rejected() {
        let mut params = FindEmbeddingParameters::default();
        params.random_seed = Some(u64::from(u32::MAX) + 1);
        assert!(matches!(
            embedding_params_raw(&params),
            Err(SolverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn solver_kind_follows_the_naming_convention() {
        assert_eq!(kind_from_name("c4-sw_sample"), SolverKind::SwSample);
        assert_eq!(kind_from_name("c4-sw_optimize"), SolverKind::SwOptimize);
        assert_eq!(kind_from_name("ss_sw_heuristic"), SolverKind::SwHeuristic);
        assert_eq!(kind_from_name("DW_2000Q_6"), SolverKind::Quantum);
    }
}
