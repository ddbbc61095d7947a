//! Map (§3.5, §4.6).
//!
//! Two paired structures, matching the original's `uw_map.c` layout:
//!
//! - a KV list (`Vec<(Value, Value)>`) in insertion order, and
//! - an open-addressing index table whose occupied slots hold a 0-based
//!   position into the KV list (`None` is the original's "entry 0 means
//!   empty" sentinel — Rust's `Option` is the natural stand-in for a
//!   reserved-value sentinel, so there's no reason to keep the 1-based
//!   shift here).
//!
//! `IndexWidth` mirrors `string.rs`'s `CapWidth`: a pure classification of
//! how wide an index-table entry *would* need to be to address the
//! current capacity, kept for parity with the original's variable-width
//! table, but never used to actually narrow the backing `Vec<Option<usize>>`.
//!
//! Map equality is **ordered KV-list equality**, not set equality: two
//! maps with the same pairs inserted in a different order compare
//! unequal. This is inherited verbatim from `uw_map.c`'s
//! `_uw_map_eq`, which walks both KV lists in lockstep — surprising, but
//! a real and deliberately preserved behavior rather than an oversight.

use crate::compound::{self, Compound, Finalize, release_owned_child};
use crate::cycle::CompoundId;
use crate::hash::HashContext;
use crate::value::Value;

const INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    W1,
    W2,
    W4,
    W8,
}

impl IndexWidth {
    pub fn for_capacity(capacity: usize) -> IndexWidth {
        let capacity = capacity as u64;
        if capacity <= 1 << 8 {
            IndexWidth::W1
        } else if capacity <= 1 << 16 {
            IndexWidth::W2
        } else if capacity <= 1u64 << 32 {
            IndexWidth::W4
        } else {
            IndexWidth::W8
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::W1 => 1,
            IndexWidth::W2 => 2,
            IndexWidth::W4 => 4,
            IndexWidth::W8 => 8,
        }
    }
}

fn hash_key(key: &Value) -> u64 {
    let mut ctx = HashContext::init();
    key.hash(&mut ctx);
    ctx.finish()
}

enum Probe {
    Hit(usize),
    Miss { empty_slot: usize, distance: usize },
}

pub struct MapData {
    kv: Vec<(Value, Value)>,
    slots: Vec<Option<usize>>,
    capacity: usize,
}

impl MapData {
    fn new() -> Self {
        MapData {
            kv: Vec::new(),
            slots: vec![None; INITIAL_CAPACITY],
            capacity: INITIAL_CAPACITY,
        }
    }

    fn probe(&self, key: &Value) -> Probe {
        let mask = self.capacity - 1;
        let mut idx = (hash_key(key) as usize) & mask;
        let mut distance = 0;
        loop {
            match self.slots[idx] {
                None => return Probe::Miss { empty_slot: idx, distance },
                Some(kv_index) if self.kv[kv_index].0.equal(key) => return Probe::Hit(kv_index),
                _ => {}
            }
            idx = (idx + 1) & mask;
            distance += 1;
            if distance >= self.capacity {
                return Probe::Miss { empty_slot: idx, distance };
            }
        }
    }

    fn grow(&mut self) {
        self.capacity *= 2;
        self.slots = vec![None; self.capacity];
        let mask = self.capacity - 1;
        for (kv_index, (key, _)) in self.kv.iter().enumerate() {
            let mut idx = (hash_key(key) as usize) & mask;
            while self.slots[idx].is_some() {
                idx = (idx + 1) & mask;
            }
            self.slots[idx] = Some(kv_index);
        }
    }

    fn index_width(&self) -> IndexWidth {
        IndexWidth::for_capacity(self.capacity)
    }
}

impl Finalize for MapData {
    fn finalize_children(&mut self, self_id: CompoundId) {
        for (key, value) in self.kv.drain(..) {
            release_owned_child(self_id, key);
            release_owned_child(self_id, value);
        }
    }
}

/// A refcounted, insertion-ordered key/value map.
#[derive(Clone, Debug)]
pub struct SeqMap(Compound<MapData>);

impl SeqMap {
    pub fn new() -> Self {
        SeqMap(Compound::new(MapData::new()))
    }

    pub fn id(&self) -> CompoundId {
        self.0.id()
    }

    pub fn length(&self) -> usize {
        self.0.with_data(|d| d.kv.len())
    }

    pub fn index_width(&self) -> IndexWidth {
        self.0.with_data(|d| d.index_width())
    }

    pub fn has_key(&self, key: &Value) -> bool {
        self.0.with_data(|d| matches!(d.probe(key), Probe::Hit(_)))
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.with_data(|d| match d.probe(key) {
            Probe::Hit(kv_index) => Some(d.kv[kv_index].1.clone()),
            Probe::Miss { .. } => None,
        })
    }

    /// Insert or replace. On a hit, the incoming key is redundant (the
    /// stored key, which compares equal, is kept) and is simply dropped;
    /// the old value is released through the same teardown path `adopt`
    /// originally routed it through.
    pub fn update(&self, key: Value, value: Value) {
        let self_id = self.id();
        self.0.with_data_mut(|d| loop {
            match d.probe(&key) {
                Probe::Hit(kv_index) => {
                    drop(key);
                    if let Some(id) = value.compound_id() {
                        compound::adopt(self_id, id);
                    }
                    let old_value = std::mem::replace(&mut d.kv[kv_index].1, value);
                    release_owned_child(self_id, old_value);
                    return;
                }
                Probe::Miss { empty_slot, distance } => {
                    let occupied = d.kv.len();
                    let quarter = d.capacity / 4;
                    if distance > quarter || occupied + 1 > d.capacity - quarter {
                        d.grow();
                        continue;
                    }
                    if let Some(id) = key.compound_id() {
                        compound::adopt(self_id, id);
                    }
                    if let Some(id) = value.compound_id() {
                        compound::adopt(self_id, id);
                    }
                    let kv_index = d.kv.len();
                    d.kv.push((key, value));
                    d.slots[empty_slot] = Some(kv_index);
                    return;
                }
            }
        })
    }

    /// Delete `key`. Returns `false` if absent. Every index-table entry
    /// above the removed KV position is decremented, since positions
    /// shift down by one.
    pub fn delete(&self, key: &Value) -> bool {
        let self_id = self.id();
        self.0.with_data_mut(|d| match d.probe(key) {
            Probe::Hit(kv_index) => {
                for slot in d.slots.iter_mut() {
                    match slot {
                        Some(i) if *i == kv_index => *slot = None,
                        Some(i) if *i > kv_index => *i -= 1,
                        _ => {}
                    }
                }
                let (old_key, old_value) = d.kv.remove(kv_index);
                release_owned_child(self_id, old_key);
                release_owned_child(self_id, old_value);
                true
            }
            Probe::Miss { .. } => false,
        })
    }

    /// Insertion-ordered key/value pairs.
    pub fn iter(&self) -> Vec<(Value, Value)> {
        self.0.with_data(|d| d.kv.clone())
    }

    /// Ordered KV-list equality, not set equality — two maps built with
    /// the same pairs in a different order compare unequal. See the
    /// module doc comment.
    pub fn equal(&self, other: &SeqMap) -> bool {
        if self.id() == other.id() {
            return true;
        }
        self.0.with_data(|a| {
            other.0.with_data(|b| {
                a.kv.len() == b.kv.len()
                    && a.kv
                        .iter()
                        .zip(b.kv.iter())
                        .all(|((k1, v1), (k2, v2))| k1.equal(k2) && v1.equal(v2))
            })
        })
    }

    pub fn hash(&self, ctx: &mut HashContext) {
        ctx.feed_u64(crate::typereg::UwTypeId::MAP.0 as u64);
        self.0.with_data(|d| {
            ctx.feed_u64(d.kv.len() as u64);
            for (k, v) in &d.kv {
                k.hash(ctx);
                v.hash(ctx);
            }
        });
    }

    pub fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        write!(out, "{{")?;
        self.0.with_data(|d| -> std::fmt::Result {
            for (i, (k, v)) in d.kv.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                k.dump(out)?;
                write!(out, ": ")?;
                v.dump(out)?;
            }
            Ok(())
        })?;
        write!(out, "}}")
    }
}

impl Default for SeqMap {
    fn default() -> Self {
        SeqMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_then_get_and_has_key() {
        let map = SeqMap::new();
        map.update(Value::from_str("a"), Value::Int(1));
        map.update(Value::from_str("b"), Value::Int(2));
        assert!(map.get(&Value::from_str("a")).unwrap().equal(&Value::Int(1)));
        assert!(map.has_key(&Value::from_str("a")));
    }

    #[test]
    fn delete_matches_spec_boundary_example() {
        let map = SeqMap::new();
        map.update(Value::from_str("a"), Value::Int(1));
        map.update(Value::from_str("b"), Value::Int(2));
        assert!(map.delete(&Value::from_str("a")));
        assert_eq!(map.length(), 1);
        assert!(!map.has_key(&Value::from_str("a")));
        let remaining = map.iter();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].0.equal(&Value::from_str("b")));
        assert!(remaining[0].1.equal(&Value::Int(2)));
    }

    #[test]
    fn update_on_existing_key_replaces_value() {
        let map = SeqMap::new();
        map.update(Value::from_str("a"), Value::Int(1));
        map.update(Value::from_str("a"), Value::Int(99));
        assert_eq!(map.length(), 1);
        assert!(map.get(&Value::from_str("a")).unwrap().equal(&Value::Int(99)));
    }

    #[test]
    fn delete_missing_key_returns_false() {
        let map = SeqMap::new();
        assert!(!map.delete(&Value::from_str("nope")));
    }

    #[test]
    fn grows_past_initial_capacity_without_losing_entries() {
        let map = SeqMap::new();
        for i in 0..100 {
            map.update(Value::Int(i), Value::Int(i * 2));
        }
        assert_eq!(map.length(), 100);
        for i in 0..100 {
            assert!(map.get(&Value::Int(i)).unwrap().equal(&Value::Int(i * 2)));
        }
    }

    #[test]
    fn equality_is_ordered_not_set_based() {
        let a = SeqMap::new();
        a.update(Value::from_str("a"), Value::Int(1));
        a.update(Value::from_str("b"), Value::Int(2));
        let b = SeqMap::new();
        b.update(Value::from_str("b"), Value::Int(2));
        b.update(Value::from_str("a"), Value::Int(1));
        assert!(!a.equal(&b), "same pairs, different insertion order must compare unequal");
    }

    #[test]
    fn iteration_is_insertion_order() {
        let map = SeqMap::new();
        map.update(Value::from_str("z"), Value::Int(1));
        map.update(Value::from_str("a"), Value::Int(2));
        let keys: Vec<_> = map.iter().into_iter().map(|(k, _)| k).collect();
        assert!(keys[0].equal(&Value::from_str("z")));
        assert!(keys[1].equal(&Value::from_str("a")));
    }
}
