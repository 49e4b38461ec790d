// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays participant storage: allocation, topology, and value
//! bookkeeping.

use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::association::Associations;
use super::id::{INVALID, ParticipantId, Status};
use super::traverse::{Ancestors, Children};
use crate::dirty;

/// Struct-of-arrays storage for the containment tree.
///
/// Participants are addressed by [`ParticipantId`] handles. Each one occupies
/// a slot in parallel arrays; destroyed participants are recycled through a
/// free list and generation counters reject stale handles.
///
/// Mutation goes through the [`Translator`](crate::translator::Translator),
/// which keeps the ordering graph and the tree in step. The store itself is
/// exposed read-only.
#[derive(Debug)]
pub struct ParticipantStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) ref_count: Vec<u32>,

    // -- Ordering state (written by the translator) --
    pub(crate) independent: Vec<bool>,
    pub(crate) marked: Vec<bool>,
    pub(crate) own_layer: Vec<Option<i32>>,
    pub(crate) associations: Vec<Associations>,
    pub(crate) root_associations: Associations,

    // -- Computed (written by evaluate) --
    pub(crate) effective_layer: Vec<Option<i32>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_rank: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for ParticipantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            ref_count: Vec::new(),
            independent: Vec::new(),
            marked: Vec::new(),
            own_layer: Vec::new(),
            associations: Vec::new(),
            root_associations: Associations::default(),
            effective_layer: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_rank: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation --

    /// Creates an unattached participant.
    pub(crate) fn create(&mut self) -> ParticipantId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.ref_count[i] = 0;
            self.independent[i] = false;
            self.marked[i] = false;
            self.own_layer[i] = None;
            self.associations[i] = Associations::default();
            self.effective_layer[i] = None;
            self.traversal_rank[i] = INVALID;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.ref_count.push(0);
            self.independent.push(false);
            self.marked.push(false);
            self.own_layer.push(None);
            self.associations.push(Associations::default());
            self.effective_layer.push(None);
            self.traversal_rank.push(INVALID);
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        ParticipantId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Frees the slot of a detached participant.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the participant is still attached or
    /// independent, or it has children.
    pub(crate) fn destroy(&mut self, id: ParticipantId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.first_child[i] == INVALID,
            "cannot destroy participant with children"
        );
        assert!(self.ref_count[i] == 0, "cannot destroy attached participant");
        assert!(
            !self.independent[i],
            "cannot destroy independent participant"
        );

        self.dirty.remove_key(id.idx);
        self.generation[i] += 1;
        self.effective_layer[i] = None;
        self.own_layer[i] = None;
        self.free_list.push(id.idx);
        self.pending_removed.push(id.idx);
    }

    /// Returns whether the handle refers to a live participant.
    #[must_use]
    pub fn is_alive(&self, id: ParticipantId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology --

    /// Attaches `id` under `parent` (or the implicit root) and returns the
    /// new reference count.
    ///
    /// Attaching again under the same parent only increments the count.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, `parent` is not attached, or `id` is
    /// already attached under a different parent.
    pub(crate) fn attach(&mut self, id: ParticipantId, parent: Option<ParticipantId>) -> u32 {
        self.validate(id);
        let c = id.idx;
        let p = match parent {
            Some(parent) => {
                self.validate(parent);
                assert!(
                    self.ref_count[parent.idx as usize] > 0,
                    "cannot attach under unattached participant {parent:?}"
                );
                assert!(parent.idx != c, "participant cannot contain itself");
                parent.idx
            }
            None => INVALID,
        };

        if self.ref_count[c as usize] > 0 {
            assert!(
                self.parent[c as usize] == p,
                "participant {id:?} is already attached under another parent"
            );
            self.ref_count[c as usize] += 1;
            return self.ref_count[c as usize];
        }

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        if p != INVALID {
            if self.first_child[p as usize] == INVALID {
                self.first_child[p as usize] = c;
            } else {
                let mut last = self.first_child[p as usize];
                while self.next_sibling[last as usize] != INVALID {
                    last = self.next_sibling[last as usize];
                }
                self.next_sibling[last as usize] = c;
                self.prev_sibling[c as usize] = last;
            }
            let _ = self.dirty.add_dependency(c, p, dirty::LAYER);
            self.dirty.mark(p, dirty::TOPOLOGY);
        } else {
            self.dirty.mark(c, dirty::TOPOLOGY);
        }

        self.ref_count[c as usize] = 1;
        self.dirty.mark_with(c, dirty::LAYER, &EagerPolicy);
        self.traversal_dirty = true;
        1
    }

    /// Drops one reference and returns the remaining count. At zero the
    /// participant leaves the tree but stays allocated.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the participant is not attached.
    pub(crate) fn detach(&mut self, id: ParticipantId) -> u32 {
        self.validate(id);
        let c = id.idx;
        assert!(
            self.ref_count[c as usize] > 0,
            "participant {id:?} is not attached"
        );
        self.ref_count[c as usize] -= 1;
        if self.ref_count[c as usize] > 0 {
            return self.ref_count[c as usize];
        }

        let p = self.parent[c as usize];
        if p != INVALID {
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, p, dirty::LAYER);
            self.dirty.mark(p, dirty::TOPOLOGY);
        } else {
            self.dirty.mark(c, dirty::TOPOLOGY);
        }
        self.dirty.mark_with(c, dirty::LAYER, &EagerPolicy);
        self.traversal_dirty = true;
        0
    }

    /// Returns the parent of a participant, or `None` under the root.
    #[must_use]
    pub fn parent(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.validate(id);
        self.id_of(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a participant.
    #[must_use]
    pub fn children(&self, id: ParticipantId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over the proper ancestors of a participant,
    /// nearest first.
    #[must_use]
    pub fn ancestors(&self, id: ParticipantId) -> Ancestors<'_> {
        self.validate(id);
        Ancestors::new(self, self.parent[id.idx as usize])
    }

    /// Returns the attached participants directly under the implicit root.
    #[must_use]
    pub fn roots(&self) -> Vec<ParticipantId> {
        (0..self.len)
            .filter(|&idx| self.is_root_at(idx))
            .filter_map(|idx| self.id_of(idx))
            .collect()
    }

    // -- Getters --

    /// Returns the reference count (0 when unattached).
    #[must_use]
    pub fn ref_count(&self, id: ParticipantId) -> u32 {
        self.validate(id);
        self.ref_count[id.idx as usize]
    }

    /// Returns whether the participant is attached to the tree.
    #[must_use]
    pub fn is_attached(&self, id: ParticipantId) -> bool {
        self.ref_count(id) > 0
    }

    /// Returns how the participant currently obtains its value.
    #[must_use]
    pub fn status(&self, id: ParticipantId) -> Status {
        self.validate(id);
        self.status_at(id.idx)
    }

    /// Returns whether the participant owns its value.
    #[must_use]
    pub fn is_independent(&self, id: ParticipantId) -> bool {
        self.validate(id);
        self.independent[id.idx as usize]
    }

    /// Returns the value the participant owns in the ordering graph.
    ///
    /// `None` unless it is independent and connected to another element.
    #[must_use]
    pub fn own_layer(&self, id: ParticipantId) -> Option<i32> {
        self.validate(id);
        self.own_layer[id.idx as usize]
    }

    /// Returns the effective layer value: its own value when independent,
    /// otherwise its nearest independent ancestor's.
    ///
    /// Only valid after [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn layer(&self, id: ParticipantId) -> Option<i32> {
        self.validate(id);
        self.effective_layer[id.idx as usize]
    }

    // -- Raw-index accessors --
    //
    // These accept slot indices as found in `StackChanges`, association maps,
    // or `traversal_order()`, skipping generation validation.

    /// Returns the effective layer value at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn layer_at(&self, idx: u32) -> Option<i32> {
        self.check_index(idx);
        self.effective_layer[idx as usize]
    }

    /// Returns the status at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn status_at(&self, idx: u32) -> Status {
        self.check_index(idx);
        let i = idx as usize;
        if self.ref_count[i] == 0 {
            Status::Unattached
        } else if self.marked[i] {
            Status::MarkedDirty
        } else if self.independent[i] {
            Status::Independent
        } else {
            Status::Inherited
        }
    }

    /// Returns the current handle of raw slot `idx`, if it is live.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> Option<ParticipantId> {
        (idx < self.len && !self.free_list.contains(&idx)).then(|| ParticipantId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Returns the number of allocated slots, live or free.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.len
    }

    // -- Ordering state (translator only) --

    /// Records the value owned in the ordering graph, marking the subtree
    /// when it changes.
    pub(crate) fn set_own_layer(&mut self, idx: u32, value: Option<i32>) {
        self.check_index(idx);
        if self.own_layer[idx as usize] != value {
            self.own_layer[idx as usize] = value;
            if self.independent[idx as usize] {
                self.dirty.mark_with(idx, dirty::LAYER, &EagerPolicy);
            }
        }
    }

    pub(crate) fn set_marked(&mut self, idx: u32, marked: bool) {
        self.check_index(idx);
        self.marked[idx as usize] = marked;
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: ParticipantId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale ParticipantId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_index(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    pub(crate) fn id_of(&self, idx: u32) -> Option<ParticipantId> {
        (idx != INVALID).then(|| ParticipantId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    pub(crate) fn is_root_at(&self, idx: u32) -> bool {
        self.parent[idx as usize] == INVALID && self.ref_count[idx as usize] > 0
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
