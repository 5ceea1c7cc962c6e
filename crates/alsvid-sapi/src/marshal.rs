// SPDX-License-Identifier: Apache-2.0
//! Marshaling between crate types and SAPI C structures.
//!
//! Three ownership shapes cross the FFI boundary:
//!
//! - **Caller-owned input** ([`CoeffBuffer`]): problem coefficients copied
//!   into a contiguous C-layout array that stays alive for the duration of
//!   the call and is freed by Rust exactly once.
//! - **Caller-owned scratch** ([`ErrorBuffer`]): a fixed-size message buffer
//!   the library writes into on failure.
//! - **Library-owned output** ([`Foreign`]): a pointer the library returns
//!   and expects back through its matching `sapi_free*` function exactly
//!   once. Unmarshalers copy the data out and `Drop` returns the pointer.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use alsvid_hal::{SolveResult, StatusSnapshot};
use alsvid_model::{Embedding, Problem, ProblemEntry};
use chrono::{DateTime, Utc};

use crate::error::{Result, SapiError};
use crate::ffi;

// ---------------------------------------------------------------------------
// Caller-owned input: problem coefficients
// ---------------------------------------------------------------------------

/// Problem coefficients marshaled into SAPI's entry layout.
///
/// The buffer owns its storage; [`as_sapi`](CoeffBuffer::as_sapi) hands out
/// a borrowed view that must not outlive the buffer.
#[derive(Debug)]
pub struct CoeffBuffer {
    entries: Vec<ffi::SapiProblemEntry>,
}

impl CoeffBuffer {
    /// Copy a problem's entries into C layout.
    ///
    /// Fails with [`SapiError::InvalidParameter`] if a variable index does
    /// not fit in the library's `int`.
    pub fn marshal(problem: &Problem) -> Result<Self> {
        let entries = problem
            .iter()
            .map(|e| {
                Ok(ffi::SapiProblemEntry {
                    i: index_to_c(e.i)?,
                    j: index_to_c(e.j)?,
                    value: e.value,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// A borrowed SAPI view of the buffer.
    pub fn as_sapi(&self) -> ffi::SapiProblem {
        ffi::SapiProblem {
            elements: self.entries.as_ptr().cast_mut(),
            len: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An embedding marshaled into SAPI's array layout.
#[derive(Debug)]
pub struct EmbeddingBuffer {
    elements: Vec<c_int>,
}

impl EmbeddingBuffer {
    /// Copy an embedding into C layout. Unused qubits stay -1.
    pub fn marshal(embedding: &Embedding) -> Result<Self> {
        let elements = embedding
            .0
            .iter()
            .map(|&v| {
                c_int::try_from(v).map_err(|_| {
                    SapiError::InvalidParameter(format!("logical variable {v} exceeds C int"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { elements })
    }

    /// A borrowed SAPI view of the buffer.
    pub fn as_sapi(&self) -> ffi::SapiEmbeddings {
        ffi::SapiEmbeddings {
            elements: self.elements.as_ptr().cast_mut(),
            len: self.elements.len(),
        }
    }
}

fn index_to_c(index: usize) -> Result<c_int> {
    c_int::try_from(index)
        .map_err(|_| SapiError::InvalidParameter(format!("variable index {index} exceeds C int")))
}

// ---------------------------------------------------------------------------
// Caller-owned scratch: error message buffer
// ---------------------------------------------------------------------------

/// Stack-allocated message buffer for `err_msg` out-parameters.
pub struct ErrorBuffer {
    buf: [c_char; ffi::SAPI_ERROR_MESSAGE_MAX_SIZE],
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; ffi::SAPI_ERROR_MESSAGE_MAX_SIZE],
        }
    }

    /// Pointer to pass to the library.
    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.buf.as_mut_ptr()
    }

    /// The NUL-terminated message the library wrote, if any.
    pub fn message(&self) -> String {
        cstr_field(&self.buf).unwrap_or_default()
    }

    /// Build the typed error for a failed call.
    pub fn into_error(self, code: c_int) -> SapiError {
        SapiError::from_code(code, self.message())
    }
}

impl Default for ErrorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Library-owned output
// ---------------------------------------------------------------------------

/// A library-owned allocation that must be released exactly once.
///
/// `Drop` passes the pointer back to the free function captured at
/// construction; [`into_raw`](Foreign::into_raw) opts out for the rare case
/// where ownership moves elsewhere.
pub struct Foreign<T> {
    ptr: *mut T,
    free: unsafe extern "C" fn(*mut T),
}

impl<T> Foreign<T> {
    /// Take ownership of a library-returned pointer.
    ///
    /// Returns `None` for a null pointer, which never needs freeing.
    pub fn new(ptr: *mut T, free: unsafe extern "C" fn(*mut T)) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr, free })
        }
    }

    /// Borrow the pointee.
    pub fn as_ref(&self) -> &T {
        // SAFETY: ptr was checked non-null at construction and the library
        // guarantees it stays valid until freed.
        unsafe { &*self.ptr }
    }

    /// Release ownership without freeing.
    pub fn into_raw(self) -> *mut T {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl<T> Drop for Foreign<T> {
    fn drop(&mut self) {
        // SAFETY: ptr is non-null, owned by the library, and freed here
        // exactly once.
        unsafe { (self.free)(self.ptr) };
    }
}

// ---------------------------------------------------------------------------
// Unmarshalers (copy out, then the Foreign wrapper frees)
// ---------------------------------------------------------------------------

/// Copy a library-owned problem into an owned [`Problem`].
pub fn problem_from_raw(raw: &ffi::SapiProblem) -> Problem {
    if raw.elements.is_null() || raw.len == 0 {
        return Problem::new();
    }
    // SAFETY: the library guarantees elements points at len valid entries.
    let entries = unsafe { std::slice::from_raw_parts(raw.elements, raw.len) };
    entries
        .iter()
        .map(|e| ProblemEntry::new(e.i as usize, e.j as usize, e.value))
        .collect()
}

/// Copy a library-owned solve result into an owned [`SolveResult`].
pub fn result_from_raw(raw: &ffi::SapiIsingResult) -> SolveResult {
    let n = raw.num_solutions;
    let len = raw.solution_len;

    let mut solutions = Vec::with_capacity(n);
    if !raw.solutions.is_null() && n > 0 && len > 0 {
        // SAFETY: solutions is a row-major n x len matrix per the SAPI
        // contract.
        let flat = unsafe { std::slice::from_raw_parts(raw.solutions, n * len) };
        for row in flat.chunks_exact(len) {
            solutions.push(row.iter().map(|&v| v as i8).collect());
        }
    }

    let energies = if raw.energies.is_null() {
        Vec::new()
    } else {
        // SAFETY: energies holds one value per solution.
        unsafe { std::slice::from_raw_parts(raw.energies, n) }.to_vec()
    };

    let occurrences = if raw.num_occurrences.is_null() {
        vec![1; n]
    } else {
        // SAFETY: num_occurrences holds one count per solution.
        unsafe { std::slice::from_raw_parts(raw.num_occurrences, n) }
            .iter()
            .map(|&c| c.max(0) as usize)
            .collect()
    };

    SolveResult {
        solutions,
        energies,
        occurrences,
        timing: None,
    }
}

/// Copy a library-owned embedding into an owned [`Embedding`].
pub fn embedding_from_raw(raw: &ffi::SapiEmbeddings) -> Embedding {
    if raw.elements.is_null() || raw.len == 0 {
        return Embedding::from(Vec::new());
    }
    // SAFETY: elements points at len valid entries per the SAPI contract.
    let elements = unsafe { std::slice::from_raw_parts(raw.elements, raw.len) };
    Embedding::from(elements.iter().map(|&v| i64::from(v)).collect::<Vec<_>>())
}

/// Decode a status struct into a [`StatusSnapshot`].
///
/// Empty timestamp strings mean the server has not reported the value;
/// they decode to `None`.
pub fn snapshot_from_raw(raw: &ffi::SapiProblemStatus) -> StatusSnapshot {
    let remote_status = match raw.remote_status {
        ffi::SAPI_REMOTE_STATUS_PENDING => alsvid_hal::RemoteStatus::Pending,
        ffi::SAPI_REMOTE_STATUS_IN_PROGRESS => alsvid_hal::RemoteStatus::InProgress,
        ffi::SAPI_REMOTE_STATUS_COMPLETED => alsvid_hal::RemoteStatus::Completed,
        ffi::SAPI_REMOTE_STATUS_FAILED => alsvid_hal::RemoteStatus::Failed,
        ffi::SAPI_REMOTE_STATUS_CANCELED => alsvid_hal::RemoteStatus::Canceled,
        _ => alsvid_hal::RemoteStatus::Unknown,
    };
    StatusSnapshot {
        id: alsvid_hal::JobId::new(cstr_field(&raw.problem_id).unwrap_or_default()),
        remote_status,
        time_received: cstr_field(&raw.time_received).and_then(parse_timestamp),
        time_solved: cstr_field(&raw.time_solved).and_then(parse_timestamp),
        error: cstr_field(&raw.error_message),
    }
}

/// Decode a fixed-size NUL-terminated C string field. Returns `None` when
/// the field is empty or not valid UTF-8.
pub fn cstr_field(field: &[c_char]) -> Option<String> {
    let bytes: &[u8] =
        // SAFETY: c_char and u8 have identical layout.
        unsafe { std::slice::from_raw_parts(field.as_ptr().cast::<u8>(), field.len()) };
    let nul = bytes.iter().position(|&b| b == 0)?;
    if nul == 0 {
        return None;
    }
    std::str::from_utf8(&bytes[..nul]).ok().map(str::to_string)
}

/// Copy a NULL-terminated array of C strings into owned form.
///
/// The array stays with its owner; nothing here is freed.
///
/// # Safety
///
/// `list` must point at an array of valid NUL-terminated strings ending
/// with a null pointer.
pub(crate) unsafe fn names_from_raw(list: *const *const c_char) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = list;
    // SAFETY: the caller guarantees each element up to the terminating null
    // is a valid C string.
    unsafe {
        while !(*cursor).is_null() {
            names.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }
    }
    names
}

fn parse_timestamp(s: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static FREED_PROBLEMS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_free_problem(_p: *mut ffi::SapiProblem) {
        FREED_PROBLEMS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn coeff_buffer_round_trips_entries() {
        let problem = Problem::from(vec![
            ProblemEntry::new(0, 0, 1.5),
            ProblemEntry::new(0, 1, -2.0),
        ]);
        let buf = CoeffBuffer::marshal(&problem).unwrap();
        let raw = buf.as_sapi();
        assert_eq!(raw.len, 2);
        assert_eq!(problem_from_raw(&raw), problem);
    }

    #[test]
    fn coeff_buffer_rejects_oversized_indices() {
        let problem = Problem::from(vec![ProblemEntry::new(usize::MAX, 0, 1.0)]);
        assert!(matches!(
            CoeffBuffer::marshal(&problem),
            Err(SapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn foreign_frees_exactly_once() {
        FREED_PROBLEMS.store(0, Ordering::SeqCst);
        let mut raw = ffi::SapiProblem {
            elements: std::ptr::null_mut(),
            len: 0,
        };

        let owned = Foreign::new(&mut raw as *mut _, counting_free_problem).unwrap();
        assert_eq!(owned.as_ref().len, 0);
        drop(owned);
        assert_eq!(FREED_PROBLEMS.load(Ordering::SeqCst), 1);

        // Null pointers are never freed.
        assert!(Foreign::new(std::ptr::null_mut(), counting_free_problem).is_none());
        assert_eq!(FREED_PROBLEMS.load(Ordering::SeqCst), 1);

        // into_raw opts out of the automatic free.
        let escaped = Foreign::new(&mut raw as *mut _, counting_free_problem).unwrap();
        let ptr = escaped.into_raw();
        assert!(!ptr.is_null());
        assert_eq!(FREED_PROBLEMS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_buffer_reads_the_written_message() {
        let mut buf = ErrorBuffer::new();
        let msg = b"connection refused\0";
        for (dst, src) in buf.buf.iter_mut().zip(msg) {
            *dst = *src as c_char;
        }
        assert_eq!(buf.message(), "connection refused");
        let err = buf.into_error(ffi::SAPI_ERR_NETWORK);
        assert!(matches!(err, SapiError::Network(m) if m == "connection refused"));
    }

    #[test]
    fn snapshot_decodes_empty_timestamps_as_unset() {
        let mut raw = ffi::SapiProblemStatus {
            problem_id: [0; ffi::SAPI_STATUS_FIELD_LEN],
            time_received: [0; ffi::SAPI_STATUS_FIELD_LEN],
            time_solved: [0; ffi::SAPI_STATUS_FIELD_LEN],
            state: ffi::SAPI_STATE_SUBMITTED,
            last_good_state: ffi::SAPI_STATE_SUBMITTED,
            remote_status: ffi::SAPI_REMOTE_STATUS_PENDING,
            error_code: 0,
            error_message: [0; ffi::SAPI_ERROR_MESSAGE_MAX_SIZE],
        };
        for (dst, src) in raw.problem_id.iter_mut().zip(b"prob-7\0") {
            *dst = *src as c_char;
        }
        for (dst, src) in raw
            .time_received
            .iter_mut()
            .zip(b"2024-03-01T12:00:00Z\0")
        {
            *dst = *src as c_char;
        }

        let snap = snapshot_from_raw(&raw);
        assert_eq!(snap.id.to_string(), "prob-7");
        assert_eq!(snap.remote_status, alsvid_hal::RemoteStatus::Pending);
        assert!(snap.time_received.is_some());
        assert!(snap.time_solved.is_none());
        assert!(snap.error.is_none());
    }

    #[test]
    fn solver_name_list_is_copied_out() {
        let a = std::ffi::CString::new("c4-sw_optimize").unwrap();
        let b = std::ffi::CString::new("c4-sw_sample").unwrap();
        let list: Vec<*const c_char> = vec![a.as_ptr(), b.as_ptr(), std::ptr::null()];

        let names = unsafe { names_from_raw(list.as_ptr()) };
        assert_eq!(names, vec!["c4-sw_optimize", "c4-sw_sample"]);

        let empty: Vec<*const c_char> = vec![std::ptr::null()];
        assert!(unsafe { names_from_raw(empty.as_ptr()) }.is_empty());
    }

    #[test]
    fn result_unmarshals_the_solution_matrix() {
        let mut solutions: Vec<c_int> = vec![1, -1, 3, -1, 1, 3];
        let mut energies = vec![-1.5, -0.5];
        let mut occurrences: Vec<c_int> = vec![7, 2];
        let raw = ffi::SapiIsingResult {
            solutions: solutions.as_mut_ptr(),
            energies: energies.as_mut_ptr(),
            num_occurrences: occurrences.as_mut_ptr(),
            num_solutions: 2,
            solution_len: 3,
        };

        let result = result_from_raw(&raw);
        assert_eq!(result.solutions, vec![vec![1, -1, 3], vec![-1, 1, 3]]);
        assert_eq!(result.energies, vec![-1.5, -0.5]);
        assert_eq!(result.occurrences, vec![7, 2]);
    }
}
