//! List (§3.4, §4.5).
//!
//! A list owns its element cells outright: `append` moves the item in and,
//! if it's a compound, calls `compound::adopt` so destroying the list
//! properly lets go of everything it holds. Backing storage is a plain
//! `Vec<Value>` — the spec's "round capacity up by a 16-item quantum"
//! growth policy is what `Vec` already gives amortized, so there's no
//! benefit to hand-rolling it the way the original's C array did.
//!
//! Appending a status value is a programming error (a list is not an error
//! channel) and panics, matching the non-recoverable-misuse convention
//! used throughout this crate (see `status.rs`'s module doc).

use crate::compound::{Compound, Finalize, release_owned_child};
use crate::cycle::CompoundId;
use crate::hash::HashContext;
use crate::status::{self, Status};
use crate::value::Value;

pub struct ListData {
    items: Vec<Value>,
}

impl Finalize for ListData {
    fn finalize_children(&mut self, self_id: CompoundId) {
        for item in self.items.drain(..) {
            release_owned_child(self_id, item);
        }
    }
}

/// A refcounted, ordered sequence of value cells.
#[derive(Clone, Debug)]
pub struct SeqList(Compound<ListData>);

impl SeqList {
    pub fn new() -> Self {
        SeqList(Compound::new(ListData { items: Vec::new() }))
    }

    pub fn from_values(items: impl IntoIterator<Item = Value>) -> Self {
        let list = SeqList::new();
        for item in items {
            list.append(item);
        }
        list
    }

    pub fn id(&self) -> CompoundId {
        self.0.id()
    }

    pub fn length(&self) -> usize {
        self.0.with_data(|d| d.items.len())
    }

    /// Clones of every element, in order.
    pub fn items(&self) -> Vec<Value> {
        self.0.with_data(|d| d.items.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Append moves `item` in. Panics if `item` is a status — a list is
    /// not an error channel.
    pub fn append(&self, item: Value) {
        assert!(
            !item.is_status(),
            "appending a status value to a list is a programming error"
        );
        if let Some(child_id) = item.compound_id() {
            crate::compound::adopt(self.id(), child_id);
        }
        self.0.with_data_mut(|d| d.items.push(item));
    }

    /// Pop the last element by move. Errors on an empty list.
    pub fn pop(&self) -> Result<Value, Status> {
        self.0
            .with_data_mut(|d| d.items.pop())
            .ok_or_else(|| Status::new(status::POP_FROM_EMPTY_LIST))
    }

    fn resolve_index(&self, i: i64, len: usize) -> usize {
        let resolved = if i < 0 { i + len as i64 } else { i };
        assert!(
            resolved >= 0 && (resolved as usize) < len,
            "list index {i} out of range for length {len}"
        );
        resolved as usize
    }

    /// A clone of element `i`; negative indices count from the end.
    pub fn item(&self, i: i64) -> Value {
        self.0.with_data(|d| {
            let idx = self.resolve_index(i, d.items.len());
            d.items[idx].clone()
        })
    }

    /// Destroy elements in the half-open range `[start, end)` and shift the
    /// tail down.
    pub fn del(&self, start: usize, end: usize) {
        let self_id = self.id();
        self.0.with_data_mut(|d| {
            assert!(start <= end && end <= d.items.len(), "del range out of bounds");
            for item in d.items.drain(start..end) {
                release_owned_child(self_id, item);
            }
        });
    }

    /// A new list holding clones of the half-open range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> SeqList {
        self.0.with_data(|d| {
            assert!(start <= end && end <= d.items.len(), "slice range out of bounds");
            SeqList::from_values(d.items[start..end].iter().map(Value::clone))
        })
    }

    pub fn equal(&self, other: &SeqList) -> bool {
        if self.id() == other.id() {
            return true;
        }
        self.0.with_data(|a| {
            other.0.with_data(|b| {
                a.items.len() == b.items.len()
                    && a.items.iter().zip(b.items.iter()).all(|(x, y)| x.equal(y))
            })
        })
    }

    pub fn hash(&self, ctx: &mut HashContext) {
        ctx.feed_u64(crate::typereg::UwTypeId::LIST.0 as u64);
        self.0.with_data(|d| {
            ctx.feed_u64(d.items.len() as u64);
            for item in &d.items {
                item.hash(ctx);
            }
        });
    }

    pub fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        write!(out, "[")?;
        self.0.with_data(|d| -> std::fmt::Result {
            for (i, item) in d.items.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                item.dump(out)?;
            }
            Ok(())
        })?;
        write!(out, "]")
    }
}

impl Default for SeqList {
    fn default() -> Self {
        SeqList::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_length_and_item_with_negative_index() {
        let list = SeqList::new();
        list.append(Value::Int(1));
        list.append(Value::Int(2));
        list.append(Value::from_str("three"));
        assert_eq!(list.length(), 3);
        assert!(list.item(-1).equal(&Value::from_str("three")));
        assert!(list.item(0).equal(&Value::Int(1)));
    }

    #[test]
    fn slice_matches_spec_boundary_example() {
        let list = SeqList::new();
        list.append(Value::Int(1));
        list.append(Value::Int(2));
        list.append(Value::from_str("three"));
        let sliced = list.slice(1, 3);
        let expected = SeqList::new();
        expected.append(Value::Int(2));
        expected.append(Value::from_str("three"));
        assert!(sliced.equal(&expected));
    }

    #[test]
    fn pop_from_empty_returns_status() {
        let list = SeqList::new();
        let err = list.pop().unwrap_err();
        assert_eq!(err.code(), status::POP_FROM_EMPTY_LIST);
    }

    #[test]
    fn pop_returns_last_element() {
        let list = SeqList::new();
        list.append(Value::Int(1));
        list.append(Value::Int(2));
        assert!(list.pop().unwrap().equal(&Value::Int(2)));
        assert_eq!(list.length(), 1);
    }

    #[test]
    fn del_shifts_tail_down() {
        let list = SeqList::new();
        for i in 0..5 {
            list.append(Value::Int(i));
        }
        list.del(1, 3);
        assert_eq!(list.length(), 3);
        assert!(list.item(0).equal(&Value::Int(0)));
        assert!(list.item(1).equal(&Value::Int(3)));
        assert!(list.item(2).equal(&Value::Int(4)));
    }

    #[test]
    fn equality_requires_same_length_and_pairwise_equal() {
        let a = SeqList::from_values([Value::Int(1), Value::Int(2)]);
        let b = SeqList::from_values([Value::Int(1), Value::Int(2)]);
        let c = SeqList::from_values([Value::Int(1)]);
        assert!(a.equal(&b));
        assert!(!a.equal(&c));
    }

    #[test]
    #[should_panic(expected = "programming error")]
    fn appending_status_panics() {
        let list = SeqList::new();
        list.append(Value::Status(Status::new(status::OOM)));
    }

    #[test]
    fn nested_list_survives_when_externally_held() {
        // A contains B; B is also held externally. Dropping A's last
        // reference must not free B out from under the external handle
        // (spec §8 cycle-safety property 3).
        let b = SeqList::new();
        let a = SeqList::new();
        a.append(Value::List(b.clone()));
        drop(a);
        assert_eq!(b.length(), 0);
        b.append(Value::Int(1));
        assert_eq!(b.length(), 1);
        assert!(b.item(0).equal(&Value::Int(1)));
    }

    #[test]
    fn self_referential_list_is_collected_on_drop() {
        let list = SeqList::new();
        let handle = Value::List(list.clone());
        list.append(handle);
        drop(list);
        // No assertion beyond "doesn't hang or panic" — the real proof is
        // in compound.rs's collection tests; this exercises the same path
        // wired through real list/value plumbing.
    }
}
