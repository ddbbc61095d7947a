//! seq-core: a dynamic-value runtime library.
//!
//! A tagged value cell (`value::Value`) covering null, bool, int/uint,
//! float, adaptive-width Unicode strings, lists, maps, statuses, and an
//! open extensibility point for user-declared compound types — plus the
//! machinery those types share: a type/interface registry for subtyping
//! and v-table dispatch (`typereg`, `iface`), a cycle-safe refcounting
//! scheme for compound ownership (`cycle`, `compound`), and the pluggable
//! allocator and hash-streamer contracts everything else is built on
//! (`alloc`, `hash`).
//!
//! # Modules
//!
//! - `error`: thread-local error reporting for FFI safety
//! - `diagnostics`: SIGQUIT-triggered stats dump
//! - `alloc`: pluggable allocator contract (§6.1)
//! - `hash`: hash streamer contract (§6.2)
//! - `charclass`: character-classification predicate set (§6.3)
//! - `status`: the value system's error channel (§4.7)
//! - `charptr`: non-owning external C-string view (§4.4)
//! - `string`: adaptive multi-width Unicode string (§4.4)
//! - `cycle`: compound parent-set tracking and cyclic-reference check (§4.3)
//! - `compound`: generic refcounted heap cell built on `cycle` (§4.2)
//! - `list`: ordered value sequence (§4.5)
//! - `map`: insertion-ordered KV list plus open-addressing index (§4.6)
//! - `typereg`: type registry and v-table dispatch (§4.1, §3.6)
//! - `iface`: interface registry (§4.1)
//! - `usercompound`: the dynamic-dispatch user compound extension point
//! - `io_traits`: File/FileReader/FileWriter/LineReader contracts (§6.4)
//! - `value`: the tagged value cell tying everything together (§3.1)

pub mod alloc;
pub mod charclass;
pub mod charptr;
pub mod compound;
pub mod cycle;
pub mod diagnostics;
pub mod error;
pub mod hash;
pub mod iface;
pub mod io_traits;
pub mod list;
pub mod map;
pub mod status;
pub mod string;
pub mod typereg;
pub mod usercompound;
pub mod value;

pub use compound::Compound;
pub use hash::HashContext;
pub use list::SeqList;
pub use map::SeqMap;
pub use status::Status;
pub use string::SeqStr;
pub use typereg::UwTypeId;
pub use usercompound::UserCompound;
pub use value::Value;

pub use error::{
    clear_runtime_error, has_runtime_error, peek_runtime_error, seqcore_clear_error,
    seqcore_get_error, seqcore_has_error, seqcore_take_error, set_runtime_error,
    take_runtime_error,
};
