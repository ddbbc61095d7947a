//! Type registry and dispatch (§3.6, §4.1).
//!
//! A fixed-capacity table keyed by an 8-bit type ID, populated at first use
//! with the built-in types in fixed slots, with room for user types to
//! register into the first free slot. Subclassing copies the ancestor's
//! v-table memberwise and lets the caller override chosen slots; "super"
//! calls resolve exactly one ancestor hop, never the full chain, per the
//! dispatch contract.

use crate::alloc::Allocator;
use crate::hash::HashContext;
use crate::status::Status;
use crate::value::Value;
use std::fmt;
use std::sync::{Mutex, OnceLock};

pub const TYPE_TABLE_CAPACITY: usize = 256;

/// An 8-bit type identifier; also the value cell's discriminant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UwTypeId(pub u8);

impl UwTypeId {
    pub const NULL: UwTypeId = UwTypeId(0);
    pub const BOOL: UwTypeId = UwTypeId(1);
    pub const INT: UwTypeId = UwTypeId(2);
    pub const SIGNED: UwTypeId = UwTypeId(3);
    pub const UNSIGNED: UwTypeId = UwTypeId(4);
    pub const FLOAT: UwTypeId = UwTypeId(5);
    pub const STRING: UwTypeId = UwTypeId(6);
    pub const CHARPTR: UwTypeId = UwTypeId(7);
    pub const LIST: UwTypeId = UwTypeId(8);
    pub const MAP: UwTypeId = UwTypeId(9);
    pub const STATUS: UwTypeId = UwTypeId(10);
    pub const USER_COMPOUND: UwTypeId = UwTypeId(11);
    pub const FILE: UwTypeId = UwTypeId(12);
    pub const STRING_IO: UwTypeId = UwTypeId(13);

    const FIRST_DYNAMIC_SLOT: u8 = 14;
}

/// Core operation v-table. Every slot is optional; `None` means "not
/// supported" and dispatch falls back to a default result or a
/// `NO_INTERFACE`/`NOT_IMPLEMENTED` status, per the dispatch contract.
#[derive(Clone, Copy)]
pub struct VTable {
    pub create: Option<fn(UwTypeId, &[Value]) -> Result<Value, Status>>,
    pub destroy: Option<fn(&mut Value)>,
    pub clone_: Option<fn(&Value) -> Value>,
    pub hash: Option<fn(&Value, &mut HashContext)>,
    pub deep_copy: Option<fn(&Value) -> Value>,
    pub dump: Option<fn(&Value, &mut dyn fmt::Write) -> fmt::Result>,
    pub to_string: Option<fn(&Value) -> String>,
    pub is_true: Option<fn(&Value) -> bool>,
    pub equal_same_type: Option<fn(&Value, &Value) -> bool>,
    pub equal: Option<fn(&Value, &Value) -> bool>,
}

impl Default for VTable {
    fn default() -> Self {
        VTable {
            create: None,
            destroy: None,
            clone_: None,
            hash: None,
            deep_copy: None,
            dump: None,
            to_string: None,
            is_true: None,
            equal_same_type: None,
            equal: None,
        }
    }
}

pub const INTERFACE_TABLE_CAPACITY: usize = 256;

/// One descriptor per registered type ID.
pub struct TypeDescriptor {
    pub id: UwTypeId,
    pub name: &'static str,
    pub ancestor_id: UwTypeId,
    pub is_compound: bool,
    pub data_optional: bool,
    pub data_offset: usize,
    pub data_size: usize,
    pub allocator: &'static dyn Allocator,
    pub vtable: VTable,
    interface_slots: Box<[Option<*const ()>]>,
}

// Safety: interface slots are raw function-table pointers into 'static
// data (leaked boxed v-tables), never mutated after registration.
unsafe impl Send for TypeDescriptor {}
unsafe impl Sync for TypeDescriptor {}

impl TypeDescriptor {
    fn new(
        id: UwTypeId,
        name: &'static str,
        ancestor_id: UwTypeId,
        is_compound: bool,
        data_optional: bool,
        data_offset: usize,
        data_size: usize,
        vtable: VTable,
    ) -> Self {
        TypeDescriptor {
            id,
            name,
            ancestor_id,
            is_compound,
            data_optional,
            data_offset,
            data_size,
            allocator: &crate::alloc::DEFAULT_ALLOCATOR,
            vtable,
            interface_slots: vec![None; INTERFACE_TABLE_CAPACITY].into_boxed_slice(),
        }
    }

    pub fn interface(&self, slot: usize) -> Option<*const ()> {
        self.interface_slots.get(slot).copied().flatten()
    }

    pub fn set_interface(&mut self, slot: usize, vtable_ptr: *const ()) {
        self.interface_slots[slot] = Some(vtable_ptr);
    }
}

struct TypeRegistry {
    slots: Vec<Option<TypeDescriptor>>,
}

impl TypeRegistry {
    fn with_builtins() -> Self {
        let mut slots: Vec<Option<TypeDescriptor>> = (0..TYPE_TABLE_CAPACITY).map(|_| None).collect();
        let builtin = |id: UwTypeId, name: &'static str, ancestor: UwTypeId, compound: bool, data_size: usize| {
            TypeDescriptor::new(id, name, ancestor, compound, false, 0, data_size, VTable::default())
        };
        slots[0] = Some(builtin(UwTypeId::NULL, "Null", UwTypeId::NULL, false, 0));
        slots[1] = Some(builtin(UwTypeId::BOOL, "Bool", UwTypeId::NULL, false, 0));
        slots[2] = Some(builtin(UwTypeId::INT, "Int", UwTypeId::NULL, false, 0));
        slots[3] = Some(builtin(UwTypeId::SIGNED, "Signed", UwTypeId::INT, false, 0));
        slots[4] = Some(builtin(UwTypeId::UNSIGNED, "Unsigned", UwTypeId::INT, false, 0));
        slots[5] = Some(builtin(UwTypeId::FLOAT, "Float", UwTypeId::NULL, false, 0));
        slots[6] = Some(builtin(UwTypeId::STRING, "String", UwTypeId::NULL, false, 0));
        slots[7] = Some(builtin(UwTypeId::CHARPTR, "CharPtr", UwTypeId::NULL, false, 0));
        slots[8] = Some(builtin(UwTypeId::LIST, "List", UwTypeId::NULL, true, 0));
        slots[9] = Some(builtin(UwTypeId::MAP, "Map", UwTypeId::NULL, true, 0));
        slots[10] = Some(builtin(UwTypeId::STATUS, "Status", UwTypeId::NULL, false, 0));
        slots[11] = Some(builtin(UwTypeId::USER_COMPOUND, "UserCompound", UwTypeId::NULL, true, 0));
        slots[12] = Some(builtin(UwTypeId::FILE, "File", UwTypeId::NULL, true, 0));
        slots[13] = Some(builtin(UwTypeId::STRING_IO, "StringIO", UwTypeId::FILE, true, 0));
        TypeRegistry { slots }
    }

    fn first_free_dynamic_slot(&self) -> Option<usize> {
        (UwTypeId::FIRST_DYNAMIC_SLOT as usize..TYPE_TABLE_CAPACITY).find(|&i| self.slots[i].is_none())
    }
}

fn registry() -> &'static Mutex<TypeRegistry> {
    static REGISTRY: OnceLock<Mutex<TypeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(TypeRegistry::with_builtins()))
}

/// Register a subclass of `ancestor_id`. The new type's `data_offset` is
/// the ancestor's `data_offset + data_size`; its v-table starts as a
/// memberwise copy of the ancestor's and can be overridden slot-by-slot
/// afterwards via `override_vtable`.
pub fn subclass(name: &'static str, ancestor_id: UwTypeId, own_data_size: usize) -> Result<UwTypeId, Status> {
    let mut reg = registry().lock().unwrap();
    let Some(slot) = reg.first_free_dynamic_slot() else {
        return Err(Status::new(crate::status::OOM));
    };
    let (ancestor_offset, ancestor_size, ancestor_vtable, ancestor_compound) = {
        let ancestor = reg.slots[ancestor_id.0 as usize]
            .as_ref()
            .expect("ancestor type must be registered");
        (ancestor.data_offset, ancestor.data_size, ancestor.vtable, ancestor.is_compound)
    };
    let id = UwTypeId(slot as u8);
    let descriptor = TypeDescriptor::new(
        id,
        name,
        ancestor_id,
        ancestor_compound,
        false,
        ancestor_offset + ancestor_size,
        own_data_size,
        ancestor_vtable,
    );
    reg.slots[slot] = Some(descriptor);
    Ok(id)
}

/// Override one or more v-table slots on an already-registered type.
pub fn override_vtable(id: UwTypeId, f: impl FnOnce(&mut VTable)) {
    let mut reg = registry().lock().unwrap();
    let descriptor = reg.slots[id.0 as usize]
        .as_mut()
        .expect("type must be registered before overriding its v-table");
    f(&mut descriptor.vtable);
}

/// Register an interface v-table pointer for a type at the given slot.
pub fn set_interface(id: UwTypeId, slot: usize, vtable_ptr: *const ()) {
    let mut reg = registry().lock().unwrap();
    let descriptor = reg.slots[id.0 as usize]
        .as_mut()
        .expect("type must be registered before setting an interface");
    descriptor.set_interface(slot, vtable_ptr);
}

pub fn with_descriptor<R>(id: UwTypeId, f: impl FnOnce(&TypeDescriptor) -> R) -> R {
    let reg = registry().lock().unwrap();
    let descriptor = reg.slots[id.0 as usize]
        .as_ref()
        .expect("type must be registered");
    f(descriptor)
}

pub fn name_of(id: UwTypeId) -> &'static str {
    with_descriptor(id, |d| d.name)
}

pub fn ancestor_of(id: UwTypeId) -> UwTypeId {
    with_descriptor(id, |d| d.ancestor_id)
}

pub fn vtable_of(id: UwTypeId) -> VTable {
    with_descriptor(id, |d| d.vtable)
}

/// Walk the ancestor chain. `Null`'s ancestor is itself, terminating the
/// walk at the root.
pub fn is_subclass_of(id: UwTypeId, target: UwTypeId) -> bool {
    let mut current = id;
    loop {
        if current == target {
            return true;
        }
        if current == UwTypeId::NULL {
            return false;
        }
        current = ancestor_of(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_expected_names() {
        assert_eq!(name_of(UwTypeId::INT), "Int");
        assert_eq!(name_of(UwTypeId::LIST), "List");
    }

    #[test]
    fn signed_is_subclass_of_int() {
        assert!(is_subclass_of(UwTypeId::SIGNED, UwTypeId::INT));
        assert!(!is_subclass_of(UwTypeId::INT, UwTypeId::SIGNED));
    }

    #[test]
    fn every_type_is_subclass_of_itself() {
        assert!(is_subclass_of(UwTypeId::STRING, UwTypeId::STRING));
    }

    #[test]
    fn unrelated_types_are_not_subclasses() {
        assert!(!is_subclass_of(UwTypeId::BOOL, UwTypeId::INT));
    }

    #[test]
    fn subclass_registration_computes_data_offset() {
        let id = subclass("TestPoint", UwTypeId::USER_COMPOUND, 16).unwrap();
        assert!(is_subclass_of(id, UwTypeId::USER_COMPOUND));
        with_descriptor(id, |d| {
            assert_eq!(d.data_offset, 0); // UserCompound's own data_size is 0
            assert_eq!(d.data_size, 16);
        });
    }

    #[test]
    fn subclass_of_subclass_offsets_stack() {
        let base = subclass("Base1", UwTypeId::USER_COMPOUND, 8).unwrap();
        let derived = subclass("Derived1", base, 4).unwrap();
        with_descriptor(derived, |d| {
            assert_eq!(d.data_offset, 8);
            assert_eq!(d.data_size, 4);
        });
    }

    #[test]
    fn override_vtable_replaces_single_slot() {
        let id = subclass("Overridable", UwTypeId::USER_COMPOUND, 0).unwrap();
        fn custom_is_true(_: &Value) -> bool {
            true
        }
        override_vtable(id, |vt| vt.is_true = Some(custom_is_true));
        let vt = vtable_of(id);
        assert!(vt.is_true.is_some());
        assert!(vt.hash.is_none());
    }
}
