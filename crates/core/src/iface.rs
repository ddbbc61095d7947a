//! Interface registry (§4.1).
//!
//! Interfaces are a separate numbering space from type IDs: each interface
//! is a slot index, and each `TypeDescriptor` carries a per-type array of
//! interface v-table pointers indexed by that slot (see
//! `typereg::TypeDescriptor::interface`/`set_interface`). Looking up an
//! unimplemented interface on a type returns `None` (the caller typically
//! turns that into a `NO_INTERFACE` status).

use std::sync::atomic::{AtomicUsize, Ordering};

/// Reserved built-in interface slots, IDs 0-10.
pub const LOGIC: usize = 0;
pub const ARITHMETIC: usize = 1;
pub const BITWISE: usize = 2;
pub const COMPARISON: usize = 3;
pub const RANDOM_ACCESS: usize = 4;
pub const STRING: usize = 5;
pub const LIST: usize = 6;
pub const FILE: usize = 7;
pub const FILE_READER: usize = 8;
pub const FILE_WRITER: usize = 9;
pub const LINE_READER: usize = 10;

const FIRST_DYNAMIC_INTERFACE: usize = 11;

static NEXT_INTERFACE: AtomicUsize = AtomicUsize::new(FIRST_DYNAMIC_INTERFACE);

/// Allocate the next free interface slot ID. Interface slots, like type
/// IDs, are monotonic for the life of the process.
pub fn register_interface() -> usize {
    let id = NEXT_INTERFACE.fetch_add(1, Ordering::SeqCst);
    assert!(
        id < crate::typereg::INTERFACE_TABLE_CAPACITY,
        "interface table exhausted"
    );
    id
}

/// Look up interface `slot` on type `id`, returning the raw v-table
/// pointer the type registered (if any). Callers downcast via the
/// interface's own known v-table struct type.
pub fn lookup(id: crate::typereg::UwTypeId, slot: usize) -> Option<*const ()> {
    crate::typereg::with_descriptor(id, |d| d.interface(slot))
}
