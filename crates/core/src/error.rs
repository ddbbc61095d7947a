//! Thread-local error reporting for FFI-safe diagnostics.
//!
//! Most operations in this crate report failure as a `Status` value (see
//! `status.rs`) — that is the primary error channel per the public value
//! surface. This module exists for the minority of call sites that cannot
//! return a `Status` directly (panics unwinding across an FFI boundary,
//! assertion helpers that fire before a `Status` can be constructed) and
//! need somewhere to stash a human-readable message for the caller to pick
//! up afterwards.
//!
//! Mirrors the thread-local string slot used for the same purpose elsewhere
//! in this codebase, down to caching the `CString` conversion so repeated
//! FFI reads don't reallocate.

use std::cell::RefCell;
use std::ffi::CString;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
    static CACHED_ERROR_CSTRING: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record a message in the calling thread's last-error slot.
pub fn set_runtime_error(message: impl Into<String>) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message.into()));
    CACHED_ERROR_CSTRING.with(|slot| *slot.borrow_mut() = None);
}

/// Check whether the calling thread has a pending error, without consuming it.
pub fn has_runtime_error() -> bool {
    LAST_ERROR.with(|slot| slot.borrow().is_some())
}

/// Read the pending error without consuming it.
pub fn peek_runtime_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Take and clear the pending error.
pub fn take_runtime_error() -> Option<String> {
    CACHED_ERROR_CSTRING.with(|slot| *slot.borrow_mut() = None);
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Clear the pending error without reading it.
pub fn clear_runtime_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
    CACHED_ERROR_CSTRING.with(|slot| *slot.borrow_mut() = None);
}

/// Format a `std::panic` payload (the value carried by `PanicHookInfo::payload`)
/// into a readable string. Payloads are almost always `&str` or `String`; fall
/// back to a generic label for anything else.
pub fn format_panic_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// # Safety
/// The returned pointer is valid only until the next call into this crate
/// on the same thread. Callers must copy the string out before making
/// further calls.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn seqcore_has_error() -> bool {
    has_runtime_error()
}

/// # Safety
/// Returns null if there is no pending error. The returned pointer is valid
/// only until the next call into this crate on the same thread, and embedded
/// NUL bytes in the message are truncated at the first occurrence.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn seqcore_get_error() -> *const std::os::raw::c_char {
    let Some(message) = peek_runtime_error() else {
        return std::ptr::null();
    };
    let sanitized = sanitize_for_c(&message);
    CACHED_ERROR_CSTRING.with(|slot| {
        *slot.borrow_mut() = Some(sanitized);
        slot.borrow().as_ref().unwrap().as_ptr()
    })
}

/// # Safety
/// Same pointer-lifetime caveats as `seqcore_get_error`; additionally clears
/// the slot, so a second call returns null until another error is set.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn seqcore_take_error() -> *const std::os::raw::c_char {
    let Some(message) = take_runtime_error() else {
        return std::ptr::null();
    };
    let sanitized = sanitize_for_c(&message);
    CACHED_ERROR_CSTRING.with(|slot| {
        *slot.borrow_mut() = Some(sanitized);
        slot.borrow().as_ref().unwrap().as_ptr()
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn seqcore_clear_error() {
    clear_runtime_error();
}

fn sanitize_for_c(message: &str) -> CString {
    match CString::new(message) {
        Ok(c) => c,
        Err(e) => {
            let valid_up_to = e.nul_position();
            CString::new(&message.as_bytes()[..valid_up_to]).unwrap_or_default()
        }
    }
}
