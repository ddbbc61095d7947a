//! The value cell (§3.1, §4.2, §9 "Tagged-union value cell").
//!
//! The original's 16-byte tagged cell becomes an ordinary Rust sum type:
//! one variant per built-in, plus `UserCompound` for the dynamic-dispatch
//! extension point. The spec is explicit that the 128-bit packed layout
//! "is an optimization, not a contract" — an enum gives the same cheap
//! move-and-compare properties without needing manual tag bits.
//!
//! Lifecycle operations that the original dispatched through a per-type
//! v-table are, for built-ins, just `match` arms here — List/Map/String
//! already know how to hash/equal/dump themselves. Only `UserCompound`
//! actually consults `typereg`'s v-table, since that's the one variant
//! whose behavior is genuinely unknown until registration time.

use crate::cycle::CompoundId;
use crate::hash::HashContext;
use crate::list::SeqList;
use crate::map::SeqMap;
use crate::status::Status;
use crate::string::SeqStr;
use crate::typereg::{self, UwTypeId};
use crate::usercompound::UserCompound;
use std::fmt;

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(SeqStr),
    List(SeqList),
    Map(SeqMap),
    Status(Status),
    UserCompound(UserCompound),
}

/// A single shared tag so an `Int`, `UInt`, or integral `Float` that
/// compare equal also hash equal — required for map lookups across
/// numeric types (§3.5's "equal keys... map to the same KV entry").
/// Non-integral floats never equal an `Int`/`UInt` (see `equal`), so they
/// are free to hash under their own tag without breaking the contract.
const NUMERIC_TAG: u64 = 0x4E554D5F4B455921; // "NUM_KEY!" in ASCII, arbitrary

fn canonical_integral(v: &Value) -> Option<i128> {
    match v {
        Value::Int(i) => Some(*i as i128),
        Value::UInt(u) => Some(*u as i128),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 && *f >= i128::MIN as f64 && *f <= i128::MAX as f64 => {
            Some(*f as i128)
        }
        _ => None,
    }
}

impl Value {
    pub fn from_str(s: &str) -> Value {
        Value::String(SeqStr::from_str(s))
    }

    pub fn type_id(&self) -> UwTypeId {
        match self {
            Value::Null => UwTypeId::NULL,
            Value::Bool(_) => UwTypeId::BOOL,
            Value::Int(_) => UwTypeId::SIGNED,
            Value::UInt(_) => UwTypeId::UNSIGNED,
            Value::Float(_) => UwTypeId::FLOAT,
            Value::String(_) => UwTypeId::STRING,
            Value::List(_) => UwTypeId::LIST,
            Value::Map(_) => UwTypeId::MAP,
            Value::Status(_) => UwTypeId::STATUS,
            Value::UserCompound(u) => u.type_id(),
        }
    }

    pub fn is_subclass_of(&self, target: UwTypeId) -> bool {
        typereg::is_subclass_of(self.type_id(), target)
    }

    /// The identity of this value's heap block, if it's a compound.
    /// `None` for every scalar and for `String` (refcount-shared but not
    /// part of the cycle graph — strings can't reference other values).
    pub fn compound_id(&self) -> Option<CompoundId> {
        match self {
            Value::List(l) => Some(l.id()),
            Value::Map(m) => Some(m.id()),
            Value::UserCompound(u) => Some(u.id()),
            _ => None,
        }
    }

    pub fn is_compound(&self) -> bool {
        self.compound_id().is_some()
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Value::Status(_))
    }

    pub fn equal(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Int(a), UInt(b)) | (UInt(b), Int(a)) => (*a as i128) == (*b as i128),
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (UInt(a), Float(b)) | (Float(b), UInt(a)) => (*a as f64) == *b,
            (String(a), String(b)) => a.equal(b),
            (List(a), List(b)) => a.equal(b),
            (Map(a), Map(b)) => a.equal(b),
            (Status(a), Status(b)) => a.equal(b),
            (UserCompound(a), UserCompound(b)) => {
                if a.type_id() == b.type_id() {
                    if let Some(f) = typereg::vtable_of(a.type_id()).equal_same_type {
                        return f(self, other);
                    }
                } else if let Some(f) = typereg::vtable_of(a.type_id()).equal {
                    return f(self, other);
                }
                a.equal(b)
            }
            _ => false,
        }
    }

    pub fn hash(&self, ctx: &mut HashContext) {
        if let Some(n) = canonical_integral(self) {
            ctx.feed_u64(NUMERIC_TAG);
            let bits = n as u128;
            ctx.feed_u64((bits >> 64) as u64);
            ctx.feed_u64(bits as u64);
            return;
        }
        match self {
            Value::Null => ctx.feed_u64(UwTypeId::NULL.0 as u64),
            Value::Bool(b) => {
                ctx.feed_u64(UwTypeId::BOOL.0 as u64);
                ctx.feed_u64(*b as u64);
            }
            Value::Float(f) => {
                ctx.feed_u64(UwTypeId::FLOAT.0 as u64);
                ctx.feed_u64(f.to_bits());
            }
            Value::String(s) => s.hash(ctx),
            Value::List(l) => l.hash(ctx),
            Value::Map(m) => m.hash(ctx),
            Value::Status(s) => s.hash(ctx),
            Value::UserCompound(u) => {
                if let Some(f) = typereg::vtable_of(u.type_id()).hash {
                    f(self, ctx);
                } else {
                    u.hash(ctx);
                }
            }
            // Int/UInt are always caught by `canonical_integral` above.
            Value::Int(_) | Value::UInt(_) => unreachable!(),
        }
    }

    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Value::Null => write!(out, "null"),
            Value::Bool(b) => write!(out, "{b}"),
            Value::Int(i) => write!(out, "{i}"),
            Value::UInt(u) => write!(out, "{u}"),
            Value::Float(f) => write!(out, "{f}"),
            Value::String(s) => write!(out, "\"{s}\""),
            Value::List(l) => l.dump(out),
            Value::Map(m) => m.dump(out),
            Value::Status(s) => s.dump(out),
            Value::UserCompound(u) => {
                if let Some(f) = typereg::vtable_of(u.type_id()).dump {
                    f(self, out)
                } else {
                    u.dump(out)
                }
            }
        }
    }

    pub fn to_display_string(&self) -> String {
        if let Value::UserCompound(u) = self {
            if let Some(f) = typereg::vtable_of(u.type_id()).to_string {
                return f(self);
            }
        }
        self.to_string()
    }

    pub fn is_true(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => m.length() != 0,
            Value::Status(_) => false,
            Value::UserCompound(u) => {
                if let Some(f) = typereg::vtable_of(u.type_id()).is_true {
                    f(self)
                } else {
                    u.field_count() != 0
                }
            }
        }
    }

    /// Walks structure, allocating fresh payload for every compound;
    /// strings remain refcount-shared (§4.2, §9 copy-on-write note).
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::List(l) => Value::List(SeqList::from_values(l.items().into_iter().map(|v| v.deep_copy()))),
            Value::Map(m) => {
                let copy = SeqMap::new();
                for (k, v) in m.iter() {
                    copy.update(k.deep_copy(), v.deep_copy());
                }
                Value::Map(copy)
            }
            Value::UserCompound(u) => {
                if let Some(f) = typereg::vtable_of(u.type_id()).deep_copy {
                    f(self)
                } else {
                    let fields = (0..u.field_count()).map(|i| u.field(i).deep_copy()).collect();
                    Value::UserCompound(UserCompound::new(u.type_id(), fields))
                }
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_uint_compare_equal_in_higher_precision_domain() {
        assert!(Value::Int(5).equal(&Value::UInt(5)));
        assert!(!Value::Int(-1).equal(&Value::UInt(u64::MAX)));
    }

    #[test]
    fn int_and_float_compare_via_float_conversion() {
        assert!(Value::Int(3).equal(&Value::Float(3.0)));
        assert!(!Value::Int(3).equal(&Value::Float(3.5)));
    }

    #[test]
    fn numeric_types_that_compare_equal_also_hash_equal() {
        let mut h1 = HashContext::init();
        Value::Int(7).hash(&mut h1);
        let mut h2 = HashContext::init();
        Value::UInt(7).hash(&mut h2);
        let mut h3 = HashContext::init();
        Value::Float(7.0).hash(&mut h3);
        let f1 = h1.finish();
        let f2 = h2.finish();
        let f3 = h3.finish();
        assert_eq!(f1, f2);
        assert_eq!(f2, f3);
    }

    #[test]
    fn dump_quotes_strings_and_leaves_numbers_bare() {
        assert_eq!(Value::from_str("hi").to_display_string(), "\"hi\"");
        assert_eq!(Value::Int(42).to_display_string(), "42");
    }

    #[test]
    fn is_true_matches_spec_truthiness_rules() {
        assert!(!Value::Null.is_true());
        assert!(!Value::Int(0).is_true());
        assert!(Value::Int(1).is_true());
        assert!(!Value::from_str("").is_true());
        assert!(Value::from_str("x").is_true());
    }

    #[test]
    fn status_is_never_true() {
        assert!(!Value::Status(Status::new(crate::status::OK)).is_true());
        assert!(!Value::Status(Status::new(crate::status::OOM)).is_true());
    }

    #[test]
    fn deep_copy_of_list_produces_independent_compound() {
        let inner = SeqList::from_values([Value::Int(1)]);
        let outer = SeqList::from_values([Value::List(inner.clone())]);
        let copy = Value::List(outer).deep_copy();
        if let Value::List(copied_outer) = copy {
            if let Value::List(copied_inner) = copied_outer.item(0) {
                assert_ne!(copied_inner.id(), inner.id());
                assert!(copied_inner.equal(&inner));
            } else {
                panic!("expected nested list");
            }
        } else {
            panic!("expected list");
        }
    }
}
