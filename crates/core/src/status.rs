//! Status — the value system's only error channel (§4.7, §7).
//!
//! A `Status` is a first-class value, not a separate Rust error type: any
//! operation that can fail returns a `Value::Status(...)` on the failure
//! path and the value in question on success, so callers use the same
//! equality/clone/dump machinery on errors as on data. Programmer errors
//! (wrong-type assertions, out-of-range indices) are a different thing
//! entirely and go through `panic!`, per §7.

use std::sync::{Mutex, OnceLock};

/// Which half of the tagged union is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// `code` names a slot in the process-wide status table.
    Default,
    /// `code` (reinterpreted as `i32`) is a raw `errno` value.
    Errno,
}

/// A status cell: class + 16-bit code, with an optional heap-allocated
/// description for the `Default` class. `Errno`-class statuses never carry
/// a description — `strerror`-equivalent lookup happens at render time.
#[derive(Debug, Clone)]
pub struct Status {
    class: StatusClass,
    code: u16,
    description: Option<String>,
}

// Built-in status codes, fixed slots in the registry (mirrors spec §7's table).
pub const OK: u16 = 0;
pub const VA_END: u16 = 1;
pub const OOM: u16 = 2;
pub const NOT_IMPLEMENTED: u16 = 3;
pub const INCOMPATIBLE_TYPE: u16 = 4;
pub const NO_INTERFACE: u16 = 5;
pub const EOF: u16 = 6;
pub const GONE: u16 = 7;
pub const POP_FROM_EMPTY_LIST: u16 = 8;
pub const KEY_NOT_FOUND: u16 = 9;
pub const FILE_ALREADY_OPENED: u16 = 10;
pub const FD_ALREADY_SET: u16 = 11;
pub const CANNOT_SET_FILENAME: u16 = 12;
pub const PUSHBACK_FAILED: u16 = 13;

const BUILTIN_NAMES: &[&str] = &[
    "OK",
    "VA_END",
    "OOM",
    "NOT_IMPLEMENTED",
    "INCOMPATIBLE_TYPE",
    "NO_INTERFACE",
    "EOF",
    "GONE",
    "POP_FROM_EMPTY_LIST",
    "KEY_NOT_FOUND",
    "FILE_ALREADY_OPENED",
    "FD_ALREADY_SET",
    "CANNOT_SET_FILENAME",
    "PUSHBACK_FAILED",
];

/// Process-wide, monotonically growing table of default-class status code
/// names. Mirrors the original's page-granularity-growing table, minus the
/// `mmap`/`mremap` pointer-stability trick: nothing here hands out a raw
/// pointer into the table, only owned `String`s, so a `Vec` behind a
/// `Mutex` is sufficient and considerably simpler.
fn registry() -> &'static Mutex<Vec<String>> {
    static REGISTRY: OnceLock<Mutex<Vec<String>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(BUILTIN_NAMES.iter().map(|s| s.to_string()).collect()))
}

/// Register a new default-class status code, returning its assigned slot.
/// Codes are never unregistered.
pub fn define_status(name: impl Into<String>) -> u16 {
    let mut table = registry().lock().unwrap();
    assert!(table.len() < u16::MAX as usize, "status table exhausted");
    table.push(name.into());
    (table.len() - 1) as u16
}

/// Look up a default-class status code's name; `"(unknown)"` if unregistered.
pub fn status_name(code: u16) -> String {
    let table = registry().lock().unwrap();
    table
        .get(code as usize)
        .cloned()
        .unwrap_or_else(|| "(unknown)".to_string())
}

impl Status {
    pub fn new(code: u16) -> Self {
        Status {
            class: StatusClass::Default,
            code,
            description: None,
        }
    }

    pub fn with_description(code: u16, description: impl Into<String>) -> Self {
        Status {
            class: StatusClass::Default,
            code,
            description: Some(description.into()),
        }
    }

    pub fn errno(errno: i32) -> Self {
        Status {
            class: StatusClass::Errno,
            code: errno as u16,
            description: None,
        }
    }

    pub fn ok() -> Self {
        Status::new(OK)
    }

    pub fn class(&self) -> StatusClass {
        self.class
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn errno_value(&self) -> Option<i32> {
        match self.class {
            StatusClass::Errno => Some(self.code as i32),
            StatusClass::Default => None,
        }
    }

    /// True for success: default-class code `OK`. Errno-class statuses are
    /// never "ok" even if the stored errno happens to be zero — presence
    /// of an errno at all signals a syscall failed.
    pub fn is_ok(&self) -> bool {
        matches!(self.class, StatusClass::Default if self.code == OK)
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.class, StatusClass::Default if self.code == EOF)
    }

    pub fn description(&self) -> &str {
        match (&self.description, self.class) {
            (Some(d), _) => d,
            (None, StatusClass::Errno) => "errno status (no stored description)",
            (None, StatusClass::Default) => "no description",
        }
    }

    pub fn name(&self) -> String {
        match self.class {
            StatusClass::Default => status_name(self.code),
            StatusClass::Errno => format!("errno({})", self.code as i32),
        }
    }

    pub fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        match self.class {
            StatusClass::Default => {
                write!(out, "{} ({}): {}", self.name(), self.code, self.description())
            }
            StatusClass::Errno => write!(out, "errno {}", self.code as i32),
        }
    }

    /// Same-type equality: class and code (or errno) must match. Descriptions
    /// are not compared, matching the original's `_uw_status_equal_sametype`.
    pub fn equal(&self, other: &Status) -> bool {
        self.class == other.class && self.code == other.code
    }

    pub fn hash(&self, ctx: &mut crate::hash::HashContext) {
        ctx.feed_u64(self.class as u64);
        ctx.feed_u64(self.code as u64);
    }
}

/// `ok(v)` per spec §4.7: true for any non-status value, and for statuses
/// whose code is the success sentinel.
pub fn ok(status: Option<&Status>) -> bool {
    match status {
        None => true,
        Some(s) => s.is_ok(),
    }
}

pub fn error(status: Option<&Status>) -> bool {
    !ok(status)
}
