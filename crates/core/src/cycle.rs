//! Compound cycle tracker (§4.3, Design Notes §9).
//!
//! Each compound carries a *parent set*: up to two inline `(parent,
//! local_refcount)` pairs before overflowing into a growable vector. This
//! is the "small-vector-optimized set of IDs" Design Notes §9 suggests in
//! place of the original's hand-rolled 4-entry chunk list — a `Vec` here
//! plays the same role with none of the manual chunk bookkeeping, since
//! Rust's allocator already amortizes growth the way the chunk list was
//! trying to.
//!
//! This module is deliberately ignorant of what a "compound" actually is:
//! it operates on an opaque `CompoundId` and a caller-supplied lookup
//! (`CompoundGraph`), so `compound.rs` can wire it to the real heap-block
//! registry without `cycle.rs` depending on `Value` at all.

/// Identity of a compound heap block, derived from its address. Opaque —
/// never dereferenced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompoundId(pub usize);

/// Per-compound record of which other compounds hold strong references to
/// it, and how many times each one does.
#[derive(Debug, Default, Clone)]
pub struct ParentSet {
    inline: [Option<(CompoundId, u32)>; 2],
    overflow: Vec<(CompoundId, u32)>,
}

impl ParentSet {
    pub fn new() -> Self {
        ParentSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inline.iter().all(Option::is_none) && self.overflow.is_empty()
    }

    fn find_mut(&mut self, parent: CompoundId) -> Option<&mut u32> {
        for slot in self.inline.iter_mut().flatten() {
            if slot.0 == parent {
                return Some(&mut slot.1);
            }
        }
        self.overflow.iter_mut().find(|e| e.0 == parent).map(|e| &mut e.1)
    }

    fn append(&mut self, parent: CompoundId) {
        for slot in self.inline.iter_mut() {
            if slot.is_none() {
                *slot = Some((parent, 1));
                return;
            }
        }
        self.overflow.push((parent, 1));
    }

    /// Record that `parent` now holds one more reference to the compound
    /// owning this parent set. Bumps the existing entry's local refcount,
    /// or appends a fresh one.
    pub fn record_adopt(&mut self, parent: CompoundId) {
        if let Some(refcount) = self.find_mut(parent) {
            *refcount += 1;
        } else {
            self.append(parent);
        }
    }

    /// Record that `parent` dropped one reference. Returns `true` if
    /// `parent` no longer holds this compound at all (its local refcount
    /// reached zero and the entry was cleared).
    pub fn record_abandon(&mut self, parent: CompoundId) -> bool {
        for slot in self.inline.iter_mut() {
            if let Some((p, count)) = slot {
                if *p == parent {
                    *count -= 1;
                    let gone = *count == 0;
                    if gone {
                        *slot = None;
                    }
                    self.shrink();
                    return gone;
                }
            }
        }
        if let Some(pos) = self.overflow.iter().position(|e| e.0 == parent) {
            self.overflow[pos].1 -= 1;
            let gone = self.overflow[pos].1 == 0;
            if gone {
                self.overflow.remove(pos);
            }
            self.shrink();
            return gone;
        }
        // Not found at all: treat as already abandoned, matching the
        // original's tolerance of a redundant abandon call.
        true
    }

    /// Migrate overflow entries back into the inline slots once there's
    /// room, mirroring the original's shrink-back-to-embedded behavior.
    fn shrink(&mut self) {
        while !self.overflow.is_empty() {
            let free_slot = self.inline.iter().position(Option::is_none);
            match free_slot {
                Some(i) => self.inline[i] = Some(self.overflow.remove(0)),
                None => break,
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CompoundId, u32)> + '_ {
        self.inline
            .iter()
            .flatten()
            .copied()
            .chain(self.overflow.iter().copied())
    }
}

/// Result of the bounded cyclic-reference DFS: whether a cycle back to the
/// starting compound was found, and whether any reachable parent had a
/// nonzero refcount of its own (meaning something outside the candidate
/// island still references the graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleCheck {
    pub cycle_found: bool,
    pub nonzero_refcount_seen: bool,
}

impl CycleCheck {
    /// Destruction may proceed only when a cycle was found and no
    /// reachable parent had a nonzero refcount anywhere in the walk.
    pub fn safe_to_destroy(&self) -> bool {
        self.cycle_found && !self.nonzero_refcount_seen
    }
}

/// What the DFS needs to know about the live compound graph, supplied by
/// `compound.rs`'s registry.
pub trait CompoundGraph {
    fn refcount(&self, id: CompoundId) -> u32;
    fn parents(&self, id: CompoundId) -> Vec<CompoundId>;
}

/// Walk every parent link transitively from `start`, looking for a path
/// back to `start` (a cycle) while recording whether any visited parent
/// has a nonzero refcount. Bounded by `visited` so a dense but acyclic
/// parent graph terminates.
pub fn check_cyclic_refs(graph: &impl CompoundGraph, start: CompoundId) -> CycleCheck {
    let mut result = CycleCheck::default();
    let mut visited = std::collections::HashSet::new();
    let mut stack = graph.parents(start);
    while let Some(parent) = stack.pop() {
        if parent == start {
            result.cycle_found = true;
            continue;
        }
        if !visited.insert(parent) {
            continue;
        }
        if graph.refcount(parent) != 0 {
            result.nonzero_refcount_seen = true;
        }
        stack.extend(graph.parents(parent));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn inline_slots_fill_before_overflow() {
        let mut set = ParentSet::new();
        set.record_adopt(CompoundId(1));
        set.record_adopt(CompoundId(2));
        assert!(set.overflow.is_empty());
        set.record_adopt(CompoundId(3));
        assert_eq!(set.overflow.len(), 1);
    }

    #[test]
    fn repeated_adopt_bumps_local_refcount_not_entry_count() {
        let mut set = ParentSet::new();
        set.record_adopt(CompoundId(1));
        set.record_adopt(CompoundId(1));
        set.record_adopt(CompoundId(1));
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(entries, vec![(CompoundId(1), 3)]);
    }

    #[test]
    fn abandon_clears_entry_at_zero() {
        let mut set = ParentSet::new();
        set.record_adopt(CompoundId(1));
        set.record_adopt(CompoundId(1));
        assert!(!set.record_abandon(CompoundId(1)));
        assert!(set.record_abandon(CompoundId(1)));
        assert!(set.is_empty());
    }

    #[test]
    fn abandon_unknown_parent_is_tolerated() {
        let mut set = ParentSet::new();
        assert!(set.record_abandon(CompoundId(99)));
    }

    #[test]
    fn overflow_shrinks_back_to_inline() {
        let mut set = ParentSet::new();
        set.record_adopt(CompoundId(1));
        set.record_adopt(CompoundId(2));
        set.record_adopt(CompoundId(3));
        assert_eq!(set.overflow.len(), 1);
        set.record_abandon(CompoundId(1));
        assert!(set.overflow.is_empty());
        let remaining: std::collections::HashSet<_> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(remaining, [CompoundId(2), CompoundId(3)].into_iter().collect());
    }

    struct TestGraph {
        refcounts: HashMap<CompoundId, u32>,
        parents: HashMap<CompoundId, Vec<CompoundId>>,
    }

    impl CompoundGraph for TestGraph {
        fn refcount(&self, id: CompoundId) -> u32 {
            *self.refcounts.get(&id).unwrap_or(&0)
        }
        fn parents(&self, id: CompoundId) -> Vec<CompoundId> {
            self.parents.get(&id).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn self_cycle_is_safe_when_no_external_refcount() {
        // A self-referential list: A's only parent is A itself.
        let graph = TestGraph {
            refcounts: HashMap::from([(CompoundId(1), 0)]),
            parents: HashMap::from([(CompoundId(1), vec![CompoundId(1)])]),
        };
        let check = check_cyclic_refs(&graph, CompoundId(1));
        assert!(check.safe_to_destroy());
    }

    #[test]
    fn mutual_cycle_is_safe_when_both_refcounts_zero() {
        let graph = TestGraph {
            refcounts: HashMap::from([(CompoundId(1), 0), (CompoundId(2), 0)]),
            parents: HashMap::from([
                (CompoundId(1), vec![CompoundId(2)]),
                (CompoundId(2), vec![CompoundId(1)]),
            ]),
        };
        assert!(check_cyclic_refs(&graph, CompoundId(1)).safe_to_destroy());
    }

    #[test]
    fn externally_held_ancestor_blocks_destruction() {
        // B contains A (A's only parent is B), but B is itself held
        // externally (nonzero refcount), so A must survive.
        let graph = TestGraph {
            refcounts: HashMap::from([(CompoundId(1), 0), (CompoundId(2), 1)]),
            parents: HashMap::from([(CompoundId(1), vec![CompoundId(2)])]),
        };
        let check = check_cyclic_refs(&graph, CompoundId(1));
        assert!(!check.cycle_found);
        assert!(check.nonzero_refcount_seen);
        assert!(!check.safe_to_destroy());
    }

    #[test]
    fn no_parents_means_no_cycle() {
        let graph = TestGraph {
            refcounts: HashMap::new(),
            parents: HashMap::new(),
        };
        let check = check_cyclic_refs(&graph, CompoundId(1));
        assert!(!check.safe_to_destroy());
    }
}
