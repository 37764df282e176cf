//! FFI bindings for Kurek Core
//!
//! This module provides C-compatible functions for driving a session from the
//! host app. Strings are null-terminated; returned strings are allocated here
//! and must be freed by the caller using `kurek_free_string`. Instants are
//! passed as Unix time in milliseconds.
//!
//! A session handle may be shared between the location callback thread and
//! the UI timer: every call takes the engine lock for its whole duration.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::Transition;
use crate::pipeline::SessionEngine;
use crate::shared::SharedSession;
use crate::types::{Fix, FixOutcome};

/// `kurek_session_push_fix` result codes
pub const KUREK_FIX_ACCEPTED: i32 = 0;
pub const KUREK_FIX_ANCHORED: i32 = 1;
pub const KUREK_FIX_IGNORED: i32 = 2;
pub const KUREK_FIX_REJECTED: i32 = 3;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    let instant = Utc.timestamp_millis_opt(millis).single();
    if instant.is_none() {
        set_last_error(&format!("Timestamp out of range: {}", millis));
    }
    instant
}

unsafe fn session_ref<'a>(handle: *const KurekSessionHandle) -> Option<&'a SharedSession> {
    if handle.is_null() {
        set_last_error("Null session pointer");
        return None;
    }
    Some(&(*handle).session)
}

fn transition_code(transition: Transition) -> i32 {
    i32::from(transition.applied())
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a session engine
pub struct KurekSessionHandle {
    session: SharedSession,
}

/// Create a new session from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `kurek_session_free`.
/// - Returns NULL on error; call `kurek_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_new(config_json: *const c_char) -> *mut KurekSessionHandle {
    clear_last_error();

    let engine = if config_json.is_null() {
        SessionEngine::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        };
        match SessionEngine::from_config_json(&json) {
            Ok(engine) => engine,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(KurekSessionHandle {
        session: SharedSession::new(engine),
    });
    Box::into_raw(handle)
}

/// Free a session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_free(handle: *mut KurekSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start or resume the session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns 1 if the phase changed, 0 if ignored, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_start(
    handle: *const KurekSessionHandle,
    now_ms: i64,
) -> i32 {
    clear_last_error();
    let (Some(session), Some(now)) = (session_ref(handle), millis_to_utc(now_ms)) else {
        return -1;
    };
    transition_code(session.with(|engine| engine.start(now)))
}

/// Pause the session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns 1 if the phase changed, 0 if ignored, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_pause(
    handle: *const KurekSessionHandle,
    now_ms: i64,
) -> i32 {
    clear_last_error();
    let (Some(session), Some(now)) = (session_ref(handle), millis_to_utc(now_ms)) else {
        return -1;
    };
    transition_code(session.with(|engine| engine.pause(now)))
}

/// Reset the session to idle and zero all totals.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_reset(handle: *const KurekSessionHandle) -> i32 {
    clear_last_error();
    let Some(session) = session_ref(handle) else {
        return -1;
    };
    session.with(|engine| engine.reset());
    0
}

/// Close the current lap.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns the new lap number, 0 while idle, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_lap(handle: *const KurekSessionHandle) -> i32 {
    clear_last_error();
    let Some(session) = session_ref(handle) else {
        return -1;
    };
    match session.with(|engine| engine.add_lap_boundary()) {
        Some(lap) => i32::try_from(lap.number).unwrap_or(i32::MAX),
        None => 0,
    }
}

/// Refresh elapsed time.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_tick(handle: *const KurekSessionHandle, now_ms: i64) -> i32 {
    clear_last_error();
    let (Some(session), Some(now)) = (session_ref(handle), millis_to_utc(now_ms)) else {
        return -1;
    };
    session.with(|engine| engine.tick(now));
    0
}

/// Change the split interval (meters).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_set_split_interval(
    handle: *const KurekSessionHandle,
    meters: u32,
) -> i32 {
    clear_last_error();
    let Some(session) = session_ref(handle) else {
        return -1;
    };
    let Some(meters) = std::num::NonZeroU32::new(meters) else {
        set_last_error("Split interval must be positive");
        return -1;
    };
    session.with(|engine| engine.set_split_interval(meters));
    0
}

/// Push one location fix.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns one of the `KUREK_FIX_*` codes, or -1 on error.
/// - For rejected fixes `kurek_last_error` holds the reason.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_push_fix(
    handle: *const KurekSessionHandle,
    latitude: f64,
    longitude: f64,
    horizontal_accuracy_m: f64,
    speed_mps: f64,
    fix_timestamp_ms: i64,
    now_ms: i64,
) -> i32 {
    clear_last_error();
    let Some(session) = session_ref(handle) else {
        return -1;
    };
    let (Some(timestamp), Some(now)) = (millis_to_utc(fix_timestamp_ms), millis_to_utc(now_ms))
    else {
        return -1;
    };

    let fix = Fix {
        latitude,
        longitude,
        horizontal_accuracy_m,
        speed_mps,
        timestamp,
    };
    match session.with(|engine| engine.ingest(&fix, now)) {
        FixOutcome::Accepted { .. } => KUREK_FIX_ACCEPTED,
        FixOutcome::Anchored => KUREK_FIX_ANCHORED,
        FixOutcome::Ignored => KUREK_FIX_IGNORED,
        FixOutcome::Rejected(reason) => {
            set_last_error(reason.as_str());
            KUREK_FIX_REJECTED
        }
    }
}

/// Current live metrics as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns a newly allocated string that must be freed with `kurek_free_string`.
/// - Returns NULL on error; call `kurek_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_metrics_json(
    handle: *const KurekSessionHandle,
) -> *mut c_char {
    clear_last_error();
    let Some(session) = session_ref(handle) else {
        return ptr::null_mut();
    };

    match serde_json::to_string(&session.metrics()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Session summary as JSON, for persistence.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kurek_session_new`.
/// - Returns a newly allocated string that must be freed with `kurek_free_string`.
/// - Returns NULL on error; call `kurek_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kurek_session_summary_json(
    handle: *const KurekSessionHandle,
    recorded_at_ms: i64,
) -> *mut c_char {
    clear_last_error();
    let (Some(session), Some(recorded_at)) = (session_ref(handle), millis_to_utc(recorded_at_ms))
    else {
        return ptr::null_mut();
    };

    match session.with(|engine| engine.summary(recorded_at)).to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Kurek functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Kurek function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kurek_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Kurek function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn kurek_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Kurek Core library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn kurek_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
