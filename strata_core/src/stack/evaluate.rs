// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value evaluation and change tracking.
//!
//! Evaluation follows the drain-recompute pattern:
//!
//! 1. **LAYER**: drain the affected indices in parent-before-child order and
//!    recompute each effective value, which is the participant's own value
//!    when it is independent and its parent's effective value otherwise.
//!    Only participants whose value actually changed are reported.
//! 2. **TOPOLOGY**: drain; a non-empty drain means the tree shape changed and
//!    the traversal order was rebuilt.
//!
//! [`StackChanges`] uses raw slot indices so callers can read values with
//! [`layer_at`](super::ParticipantStore::layer_at) without generation
//! checks.

use alloc::vec::Vec;

use super::id::{INVALID, ParticipantId};
use super::store::ParticipantStore;
use crate::dirty;

/// The changes produced by one [`ParticipantStore::evaluate`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackChanges {
    /// Participants whose effective layer value changed.
    pub layers: Vec<u32>,
    /// Participants created since the last evaluate.
    pub added: Vec<u32>,
    /// Participants destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the containment tree changed shape.
    pub topology_changed: bool,
}

impl StackChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl ParticipantStore {
    /// Recomputes dirty effective values and returns what changed.
    pub fn evaluate(&mut self) -> StackChanges {
        let mut changes = StackChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut StackChanges) {
        changes.clear();
        self.refresh_traversal();

        let dirty_layers: Vec<u32> = self
            .dirty
            .drain(dirty::LAYER)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in dirty_layers {
            let i = idx as usize;
            if idx >= self.len || self.free_list.contains(&idx) {
                continue;
            }
            let value = if self.ref_count[i] == 0 {
                None
            } else if self.independent[i] {
                self.own_layer[i]
            } else if self.parent[i] != INVALID {
                self.effective_layer[self.parent[i] as usize]
            } else {
                None
            };
            if self.effective_layer[i] != value {
                self.effective_layer[i] = value;
                changes.layers.push(idx);
            }
        }

        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Returns the attached participants in depth-first pre-order.
    ///
    /// Only valid after [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Returns the position of a participant in the traversal order, or
    /// `None` when it is unattached.
    #[must_use]
    pub fn traversal_rank(&self, id: ParticipantId) -> Option<u32> {
        self.validate(id);
        let rank = self.traversal_rank[id.idx as usize];
        (rank != INVALID).then_some(rank)
    }

    /// Rebuilds the traversal order if the tree changed shape.
    pub(crate) fn refresh_traversal(&mut self) {
        if !self.traversal_dirty {
            return;
        }
        self.traversal_dirty = false;
        self.traversal_order.clear();
        self.traversal_rank.fill(INVALID);
        for idx in 0..self.len {
            if self.is_root_at(idx) {
                self.dfs_collect(idx);
            }
        }
    }

    fn dfs_collect(&mut self, idx: u32) {
        let rank = u32::try_from(self.traversal_order.len()).unwrap_or(INVALID);
        self.traversal_rank[idx as usize] = rank;
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}
