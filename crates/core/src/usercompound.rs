//! User compound types (§3.6, §4.1 subclassing, glossary "UserCompound").
//!
//! A `UserCompound` is the open extensibility point: a `UwTypeId`
//! registered via `typereg::subclass` plus a bag of field values, with
//! behavior supplied by whichever v-table slots the registering code
//! overrode (`typereg::override_vtable`). Built-in compounds (`List`,
//! `Map`) have their lifecycle hardcoded in `value.rs`; this is the
//! fallback path used only for `UwTypeId::USER_COMPOUND` and its
//! subclasses, where the field layout is generic rather than known ahead
//! of time.
//!
//! Unoverridden slots fall back to a structural default: fields compared
//! pairwise for `equal`, fields folded in order for `hash`, and so on —
//! the same "memberwise until told otherwise" spirit as an ancestor's
//! copied v-table.

use crate::compound::{Compound, Finalize, release_owned_child};
use crate::cycle::CompoundId;
use crate::hash::HashContext;
use crate::typereg::UwTypeId;
use crate::value::Value;

pub struct UserCompoundData {
    pub type_id: UwTypeId,
    pub fields: Vec<Value>,
}

impl Finalize for UserCompoundData {
    fn finalize_children(&mut self, self_id: CompoundId) {
        for field in self.fields.drain(..) {
            release_owned_child(self_id, field);
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserCompound(Compound<UserCompoundData>);

impl UserCompound {
    pub fn new(type_id: UwTypeId, fields: Vec<Value>) -> Self {
        let handle = UserCompound(Compound::new(UserCompoundData { type_id, fields: Vec::new() }));
        let self_id = handle.id();
        handle.0.with_data_mut(|d| {
            for field in fields {
                if let Some(child_id) = field.compound_id() {
                    crate::compound::adopt(self_id, child_id);
                }
                d.fields.push(field);
            }
        });
        handle
    }

    pub fn id(&self) -> CompoundId {
        self.0.id()
    }

    pub fn type_id(&self) -> UwTypeId {
        self.0.with_data(|d| d.type_id)
    }

    pub fn field(&self, i: usize) -> Value {
        self.0.with_data(|d| d.fields[i].clone())
    }

    pub fn field_count(&self) -> usize {
        self.0.with_data(|d| d.fields.len())
    }

    pub fn equal(&self, other: &UserCompound) -> bool {
        if self.id() == other.id() {
            return true;
        }
        if self.type_id() != other.type_id() {
            return false;
        }
        self.0.with_data(|a| {
            other.0.with_data(|b| {
                a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(b.fields.iter()).all(|(x, y)| x.equal(y))
            })
        })
    }

    pub fn hash(&self, ctx: &mut HashContext) {
        ctx.feed_u64(self.type_id().0 as u64);
        self.0.with_data(|d| {
            for field in &d.fields {
                field.hash(ctx);
            }
        });
    }

    pub fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        write!(out, "{}(", crate::typereg::name_of(self.type_id()))?;
        self.0.with_data(|d| -> std::fmt::Result {
            for (i, field) in d.fields.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                field.dump(out)?;
            }
            Ok(())
        })?;
        write!(out, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typereg;

    #[test]
    fn equal_requires_same_type_and_fields() {
        let id = typereg::subclass("UserCompoundTestPoint", UwTypeId::USER_COMPOUND, 0).unwrap();
        let a = UserCompound::new(id, vec![Value::Int(1), Value::Int(2)]);
        let b = UserCompound::new(id, vec![Value::Int(1), Value::Int(2)]);
        let c = UserCompound::new(id, vec![Value::Int(9), Value::Int(2)]);
        assert!(a.equal(&b));
        assert!(!a.equal(&c));
    }

    #[test]
    fn dump_includes_type_name_and_fields() {
        let id = typereg::subclass("UserCompoundTestBox", UwTypeId::USER_COMPOUND, 0).unwrap();
        let v = UserCompound::new(id, vec![Value::Int(7)]);
        let mut out = String::new();
        v.dump(&mut out).unwrap();
        assert_eq!(out, "UserCompoundTestBox(7)");
    }

    #[test]
    fn field_ownership_releases_on_drop() {
        let id = typereg::subclass("UserCompoundTestHolder", UwTypeId::USER_COMPOUND, 0).unwrap();
        let inner = UserCompound::new(id, vec![]);
        let inner_id = inner.id();
        let outer = UserCompound::new(id, vec![Value::UserCompound(inner)]);
        drop(outer);
        let _ = inner_id; // collected via finalize_children; nothing to assert beyond no panic
    }
}
