//! Generic refcounted compound heap cell (§3.2, §4.2, §4.3).
//!
//! `Compound<T>` is the heap-resident "extra data" block every compound
//! value (`List`, `Map`, user-declared types) is built on: a refcount, a
//! `destroying` reentrancy guard, a `cycle::ParentSet`, and the
//! type-specific payload `T`. The payload's lifecycle has to cooperate
//! with the cross-type cyclic-reference check, since a `List` can hold a
//! `Map` which holds the original `List` back.
//!
//! Two distinct release paths exist, matching the spec's distinction
//! between ordinary scope-exit and container teardown:
//!
//! - **Drop** (`impl Drop for Compound<T>`): an ordinary handle going out
//!   of scope. Decrements the refcount and, if it reaches zero, attempts
//!   collection (`try_collect`).
//! - **`release_owned_child`**: used by a container's `Finalize` impl when
//!   *it* is being torn down and needs to let go of a value it owns
//!   in-place. This does not double-decrement a refcount already consumed
//!   by `adopt` — it records an `abandon` against the parent link instead,
//!   and only re-checks collectibility if that was the child's last
//!   parent link.
//!
//! Cross-type lookups (the cyclic-reference DFS, and dispatching
//! `release_owned_child`/`try_collect` to whichever concrete `T` a given
//! `CompoundId` belongs to) go through a thread-local registry of type-
//! erased function pointers, since a `List`'s parent set can name a `Map`
//! and vice versa — there is no common concrete type to dispatch on
//! without it.

use crate::cycle::{CompoundGraph, CompoundId, ParentSet, check_cyclic_refs};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Implemented by every compound payload type (`ListData`, `MapData`,
/// `UserCompoundData`) to describe how to release the `Value`s it owns
/// when the compound itself is being torn down.
pub trait Finalize {
    fn finalize_children(&mut self, self_id: CompoundId);
}

struct CompoundInner<T> {
    refcount: Cell<u32>,
    destroying: Cell<bool>,
    parents: RefCell<ParentSet>,
    data: RefCell<T>,
}

/// A refcounted handle to a compound heap block. Cloning bumps the
/// refcount (cheap, shallow); letting the last handle drop may trigger a
/// deferred destroy pending the cyclic-reference check.
pub struct Compound<T: Finalize> {
    ptr: NonNull<CompoundInner<T>>,
    _marker: PhantomData<CompoundInner<T>>,
}

#[derive(Clone, Copy)]
struct VTableOps {
    refcount: unsafe fn(*const ()) -> u32,
    parent_ids: unsafe fn(*const ()) -> Vec<CompoundId>,
    record_adopt: unsafe fn(*const (), CompoundId),
    record_abandon: unsafe fn(*const (), CompoundId) -> bool,
    decrement: unsafe fn(*const ()),
    try_collect: unsafe fn(*const ()),
}

thread_local! {
    static REGISTRY: RefCell<HashMap<usize, VTableOps>> = RefCell::new(HashMap::new());
}

unsafe fn refcount_impl<T>(ptr: *const ()) -> u32 {
    let inner = unsafe { &*(ptr as *const CompoundInner<T>) };
    inner.refcount.get()
}

unsafe fn parent_ids_impl<T>(ptr: *const ()) -> Vec<CompoundId> {
    let inner = unsafe { &*(ptr as *const CompoundInner<T>) };
    inner.parents.borrow().iter().map(|(id, _)| id).collect()
}

unsafe fn record_adopt_impl<T>(ptr: *const (), parent: CompoundId) {
    let inner = unsafe { &*(ptr as *const CompoundInner<T>) };
    inner.parents.borrow_mut().record_adopt(parent);
}

unsafe fn record_abandon_impl<T>(ptr: *const (), parent: CompoundId) -> bool {
    let inner = unsafe { &*(ptr as *const CompoundInner<T>) };
    inner.parents.borrow_mut().record_abandon(parent)
}

unsafe fn decrement_impl<T>(ptr: *const ()) {
    let inner = unsafe { &*(ptr as *const CompoundInner<T>) };
    inner.refcount.set(inner.refcount.get().saturating_sub(1));
}

unsafe fn try_collect_impl<T: Finalize>(ptr: *const ()) {
    let typed = unsafe { NonNull::new_unchecked(ptr as *mut CompoundInner<T>) };
    try_collect(typed);
}

fn ops_for(id: CompoundId) -> Option<VTableOps> {
    REGISTRY.with(|r| r.borrow().get(&id.0).copied())
}

/// Number of compound heap blocks currently registered on this thread.
/// Used by `diagnostics.rs` and by cycle-safety tests asserting that
/// everything was eventually collected.
pub fn live_compound_count() -> usize {
    REGISTRY.with(|r| r.borrow().len())
}

struct Registry;

impl CompoundGraph for Registry {
    fn refcount(&self, id: CompoundId) -> u32 {
        ops_for(id)
            .map(|ops| unsafe { (ops.refcount)(id.0 as *const ()) })
            .unwrap_or(0)
    }

    fn parents(&self, id: CompoundId) -> Vec<CompoundId> {
        ops_for(id)
            .map(|ops| unsafe { (ops.parent_ids)(id.0 as *const ()) })
            .unwrap_or_default()
    }
}

/// Adopt(parent, child) (§4.3). Self-reference is a short-circuit that
/// only decrements the child's refcount, without touching its parent set.
pub fn adopt(parent: CompoundId, child: CompoundId) {
    if parent != child {
        if let Some(ops) = ops_for(child) {
            unsafe { (ops.record_adopt)(child.0 as *const (), parent) };
        }
    }
    if let Some(ops) = ops_for(child) {
        unsafe { (ops.decrement)(child.0 as *const ()) };
    }
}

/// Release a `Value` this compound directly owns, as part of its own
/// teardown. Non-compound values simply drop normally when this function
/// returns. Compound values are released via `abandon` against this
/// parent's link rather than through their ordinary `Drop` path (which
/// would double-decrement a refcount `adopt` already consumed) — and are
/// explicitly forgotten afterward so their `Drop` impl never runs at all
/// for this specific handle.
pub fn release_owned_child(parent: CompoundId, item: Value) {
    if let Some(child_id) = item.compound_id() {
        let no_longer_held = ops_for(child_id)
            .map(|ops| unsafe { (ops.record_abandon)(child_id.0 as *const (), parent) })
            .unwrap_or(true);
        std::mem::forget(item);
        if no_longer_held {
            if let Some(ops) = ops_for(child_id) {
                unsafe { (ops.try_collect)(child_id.0 as *const ()) };
            }
        }
    }
    // else: `item` drops here via its own (non-compound) Drop impl, if any.
}

fn try_collect<T: Finalize>(ptr: NonNull<CompoundInner<T>>) {
    let inner = unsafe { ptr.as_ref() };
    if inner.destroying.get() {
        return;
    }
    if inner.refcount.get() != 0 {
        return;
    }
    let id = CompoundId(ptr.as_ptr() as usize);
    if !inner.parents.borrow().is_empty() {
        let check = check_cyclic_refs(&Registry, id);
        if !check.safe_to_destroy() {
            return;
        }
    }
    inner.destroying.set(true);
    inner.data.borrow_mut().finalize_children(id);
    REGISTRY.with(|r| {
        r.borrow_mut().remove(&id.0);
    });
    // Safety: `ptr` was produced by `Box::into_raw` in `Compound::new` and
    // has not been freed; `destroying` being freshly set guarantees no
    // other live handle will touch it concurrently (single-threaded).
    unsafe {
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

impl<T: Finalize> Compound<T> {
    pub fn new(data: T) -> Self {
        let boxed = Box::new(CompoundInner {
            refcount: Cell::new(1),
            destroying: Cell::new(false),
            parents: RefCell::new(ParentSet::new()),
            data: RefCell::new(data),
        });
        let ptr = NonNull::new(Box::into_raw(boxed)).unwrap();
        REGISTRY.with(|r| {
            r.borrow_mut().insert(
                ptr.as_ptr() as usize,
                VTableOps {
                    refcount: refcount_impl::<T>,
                    parent_ids: parent_ids_impl::<T>,
                    record_adopt: record_adopt_impl::<T>,
                    record_abandon: record_abandon_impl::<T>,
                    decrement: decrement_impl::<T>,
                    try_collect: try_collect_impl::<T>,
                },
            );
        });
        Compound {
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> CompoundId {
        CompoundId(self.ptr.as_ptr() as usize)
    }

    pub fn refcount(&self) -> u32 {
        unsafe { self.ptr.as_ref() }.refcount.get()
    }

    pub fn is_embraced(&self) -> bool {
        !unsafe { self.ptr.as_ref() }.parents.borrow().is_empty()
    }

    pub fn with_data<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&unsafe { self.ptr.as_ref() }.data.borrow())
    }

    pub fn with_data_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut unsafe { self.ptr.as_ref() }.data.borrow_mut())
    }

    /// Record that `parent` now holds a strong reference to this compound,
    /// and consume the refcount unit the caller's handle represented.
    /// Callers use this when moving a compound `Value` into a container.
    pub fn adopted_by(&self, parent: CompoundId) {
        adopt(parent, self.id());
    }
}

impl<T: Finalize> std::fmt::Debug for Compound<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compound").field("id", &self.id().0).finish()
    }
}

impl<T: Finalize> Clone for Compound<T> {
    fn clone(&self) -> Self {
        let inner = unsafe { self.ptr.as_ref() };
        inner.refcount.set(inner.refcount.get() + 1);
        Compound {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: Finalize> Drop for Compound<T> {
    fn drop(&mut self) {
        let inner = unsafe { self.ptr.as_ref() };
        let rc = inner.refcount.get().saturating_sub(1);
        inner.refcount.set(rc);
        if rc == 0 {
            try_collect(self.ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Leaf {
        children: Vec<Value>,
    }

    impl Finalize for Leaf {
        fn finalize_children(&mut self, self_id: CompoundId) {
            for item in self.children.drain(..) {
                release_owned_child(self_id, item);
            }
        }
    }

    #[test]
    fn clone_bumps_refcount_drop_decrements() {
        let c = Compound::new(Leaf::default());
        assert_eq!(c.refcount(), 1);
        let c2 = c.clone();
        assert_eq!(c.refcount(), 2);
        drop(c2);
        assert_eq!(c.refcount(), 1);
    }

    #[test]
    fn unembraced_value_collects_immediately_on_drop() {
        let c = Compound::new(Leaf::default());
        let id = c.id();
        drop(c);
        assert!(ops_for(id).is_none(), "should have been unregistered");
    }

    #[test]
    fn adopt_decrements_and_records_parent_link() {
        let child = Compound::new(Leaf::default());
        let parent = Compound::new(Leaf::default());
        assert_eq!(child.refcount(), 1);
        child.adopted_by(parent.id());
        assert_eq!(child.refcount(), 0);
        assert!(child.is_embraced());
    }

    #[test]
    fn self_adopt_skips_parent_set() {
        let node = Compound::new(Leaf::default());
        let id = node.id();
        node.adopted_by(id);
        assert_eq!(node.refcount(), 0);
        assert!(!node.is_embraced());
    }
}
