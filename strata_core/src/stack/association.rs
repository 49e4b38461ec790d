// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Association maps: which independent participants sit below a node.
//!
//! Every participant, and the implicit root, keeps a map from each of its
//! *nearest* independent descendants (those with no other independent
//! participant in between) to the path of slot indices leading down to it,
//! starting at a direct child and ending at the descendant itself. A value
//! copied down from an independent participant stops at every entry of its
//! map, and the entries of one map form a sibling group for tie-breaking.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

use understory_dirty::EagerPolicy;

use super::id::{INVALID, ParticipantId};
use super::store::ParticipantStore;
use crate::dirty;
use crate::error::InvariantViolation;

/// Nearest independent descendants of one node, keyed by slot index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Associations {
    entries: BTreeMap<u32, Vec<u32>>,
}

impl Associations {
    /// Returns whether `idx` is a nearest independent descendant.
    #[must_use]
    pub fn contains(&self, idx: u32) -> bool {
        self.entries.contains_key(&idx)
    }

    /// Returns the path of slot indices from a direct child down to `idx`.
    #[must_use]
    pub fn path(&self, idx: u32) -> Option<&[u32]> {
        self.entries.get(&idx).map(Vec::as_slice)
    }

    /// Returns whether any recorded path goes through the child `child`.
    #[must_use]
    pub fn leads_through(&self, child: u32) -> bool {
        self.entries.values().any(|path| path.first() == Some(&child))
    }

    /// Returns the recorded descendants in slot order.
    pub fn descendants(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Returns `(descendant, path)` entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.entries.iter().map(|(&idx, path)| (idx, path.as_slice()))
    }

    /// Returns the number of recorded descendants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no independent participant lies below.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, idx: u32, path: Vec<u32>) {
        self.entries.insert(idx, path);
    }

    fn remove(&mut self, idx: u32) -> Option<Vec<u32>> {
        self.entries.remove(&idx)
    }
}

impl ParticipantStore {
    /// Returns the association map of a participant.
    #[must_use]
    pub fn associations(&self, id: ParticipantId) -> &Associations {
        self.validate(id);
        &self.associations[id.idx as usize]
    }

    /// Returns the association map of the implicit root.
    #[must_use]
    pub fn root_associations(&self) -> &Associations {
        &self.root_associations
    }

    /// Returns the nearest independent proper ancestor, or `None` when the
    /// implicit root is the nearest.
    #[must_use]
    pub fn nearest_independent_ancestor(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.validate(id);
        self.id_of(self.nearest_independent_above(id.idx))
    }

    /// Returns the map holding `idx`'s entry when it is independent: its
    /// nearest independent ancestor's, or the root's.
    #[must_use]
    pub fn group_of(&self, id: ParticipantId) -> &Associations {
        self.validate(id);
        self.associations_of(self.nearest_independent_above(id.idx))
    }

    pub(crate) fn nearest_independent_above(&self, idx: u32) -> u32 {
        let mut at = self.parent[idx as usize];
        while at != INVALID && !self.independent[at as usize] {
            at = self.parent[at as usize];
        }
        at
    }

    pub(crate) fn associations_of(&self, owner: u32) -> &Associations {
        if owner == INVALID {
            &self.root_associations
        } else {
            &self.associations[owner as usize]
        }
    }

    fn associations_of_mut(&mut self, owner: u32) -> &mut Associations {
        if owner == INVALID {
            &mut self.root_associations
        } else {
            &mut self.associations[owner as usize]
        }
    }

    /// Makes `idx` independent or inherited, keeping every association map
    /// between it and its nearest independent ancestor up to date.
    ///
    /// Returns `false` when nothing changed.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not attached.
    pub(crate) fn set_independent(&mut self, idx: u32, independent: bool) -> bool {
        assert!(
            self.ref_count[idx as usize] > 0,
            "participant slot {idx} is not attached"
        );
        if self.independent[idx as usize] == independent {
            return false;
        }
        let inner: Vec<(u32, Vec<u32>)> = self.associations[idx as usize]
            .entries
            .iter()
            .map(|(&d, path)| (d, path.clone()))
            .collect();

        // `trail` holds the path from the current owner's child down to
        // `idx`, innermost first.
        let mut trail = Vec::from([idx]);
        let mut child = idx;
        loop {
            let owner = self.parent[child as usize];
            let prefix: Vec<u32> = trail.iter().rev().copied().collect();
            let map = self.associations_of_mut(owner);
            if independent {
                for (d, _) in &inner {
                    map.remove(*d);
                }
                map.insert(idx, prefix);
            } else {
                map.remove(idx);
                for (d, tail) in &inner {
                    let mut path = prefix.clone();
                    path.extend_from_slice(tail);
                    map.insert(*d, path);
                }
            }
            if owner == INVALID || self.independent[owner as usize] {
                break;
            }
            trail.push(owner);
            child = owner;
        }

        self.independent[idx as usize] = independent;
        self.dirty.mark_with(idx, dirty::LAYER, &EagerPolicy);
        true
    }

    /// Checks every association map against a recomputation from scratch,
    /// and every effective value against its source.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-date map or misplaced value.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut expected: BTreeMap<u32, Associations> = BTreeMap::new();
        for idx in 0..self.len {
            if self.ref_count[idx as usize] == 0 || !self.independent[idx as usize] {
                continue;
            }
            let mut trail = Vec::from([idx]);
            let mut owner = self.parent[idx as usize];
            while owner != INVALID && !self.independent[owner as usize] {
                let prefix: Vec<u32> = trail.iter().rev().copied().collect();
                expected.entry(owner).or_default().insert(idx, prefix);
                trail.push(owner);
                owner = self.parent[owner as usize];
            }
            let prefix: Vec<u32> = trail.iter().rev().copied().collect();
            expected.entry(owner).or_default().insert(idx, prefix);
        }

        let empty = Associations::default();
        for owner in (0..self.len).chain([INVALID]) {
            if owner != INVALID && self.free_list.contains(&owner) {
                continue;
            }
            let want = expected.get(&owner).unwrap_or(&empty);
            if self.associations_of(owner) != want {
                return Err(InvariantViolation::Association(format!(
                    "{:?}",
                    self.id_of(owner)
                )));
            }
        }

        for idx in 0..self.len {
            if self.free_list.contains(&idx) {
                continue;
            }
            let want = if self.ref_count[idx as usize] == 0 {
                None
            } else if self.independent[idx as usize] {
                self.own_layer[idx as usize]
            } else {
                let source = self.nearest_independent_above(idx);
                if source == INVALID {
                    None
                } else {
                    self.own_layer[source as usize]
                }
            };
            if self.effective_layer[idx as usize] != want {
                return Err(InvariantViolation::Inheritance(format!(
                    "{:?}",
                    self.id_of(idx)
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds `root -> [a -> [b -> [c]], d]` with everything attached.
    fn tree() -> (ParticipantStore, [ParticipantId; 5]) {
        let mut store = ParticipantStore::new();
        let ids = [
            store.create(),
            store.create(),
            store.create(),
            store.create(),
            store.create(),
        ];
        let [root, a, b, c, d] = ids;
        store.attach(root, None);
        store.attach(a, Some(root));
        store.attach(b, Some(a));
        store.attach(c, Some(b));
        store.attach(d, Some(root));
        (store, ids)
    }

    #[test]
    fn independent_leaf_is_registered_up_to_the_root() {
        let (mut store, [root, a, b, c, _]) = tree();
        assert!(store.set_independent(c.idx, true));

        assert_eq!(store.associations(b).path(c.idx), Some(&[c.idx][..]));
        assert_eq!(store.associations(a).path(c.idx), Some(&[b.idx, c.idx][..]));
        assert_eq!(
            store.associations(root).path(c.idx),
            Some(&[a.idx, b.idx, c.idx][..])
        );
        assert_eq!(
            store.root_associations().path(c.idx),
            Some(&[root.idx, a.idx, b.idx, c.idx][..])
        );
        assert!(store.associations(root).leads_through(a.idx));
        assert_eq!(store.nearest_independent_ancestor(c), None);
        store.verify().unwrap();
    }

    #[test]
    fn independent_ancestor_stops_registration() {
        let (mut store, [root, a, b, c, _]) = tree();
        store.set_independent(a.idx, true);
        store.set_independent(c.idx, true);

        assert!(store.associations(a).contains(c.idx));
        assert!(!store.associations(root).contains(c.idx));
        assert!(store.associations(root).contains(a.idx));
        assert!(store.associations(b).contains(c.idx));
        assert_eq!(store.nearest_independent_ancestor(c), Some(a));
        assert!(store.group_of(c).contains(c.idx));
        store.verify().unwrap();
    }

    #[test]
    fn new_intermediate_independent_shadows_descendants() {
        let (mut store, [root, a, b, c, _]) = tree();
        store.set_independent(c.idx, true);
        store.set_independent(a.idx, true);

        assert!(!store.associations(root).contains(c.idx));
        assert_eq!(store.associations(root).path(a.idx), Some(&[a.idx][..]));
        assert_eq!(store.associations(a).path(c.idx), Some(&[b.idx, c.idx][..]));
        store.verify().unwrap();

        // Becoming inherited again reattaches `c` one level higher.
        store.set_independent(a.idx, false);
        assert!(!store.associations(root).contains(a.idx));
        assert_eq!(
            store.associations(root).path(c.idx),
            Some(&[a.idx, b.idx, c.idx][..])
        );
        assert_eq!(store.associations(a).path(c.idx), Some(&[b.idx, c.idx][..]));
        store.verify().unwrap();
    }

    #[test]
    fn sibling_branches_are_independent_of_each_other() {
        let (mut store, [root, a, _, c, d]) = tree();
        store.set_independent(c.idx, true);
        store.set_independent(d.idx, true);
        assert_eq!(store.associations(root).len(), 2);
        assert!(store.associations(root).leads_through(d.idx));
        assert!(store.associations(root).leads_through(a.idx));
        assert!(store.associations(a).contains(c.idx));
        assert!(!store.associations(a).contains(d.idx));

        store.set_independent(c.idx, false);
        assert!(store.associations(a).is_empty());
        assert_eq!(store.associations(root).descendants().collect::<Vec<_>>(), [d.idx]);
        store.verify().unwrap();
    }

    #[test]
    fn repeated_flag_is_a_no_op() {
        let (mut store, [_, _, b, _, _]) = tree();
        assert!(store.set_independent(b.idx, true));
        assert!(!store.set_independent(b.idx, true));
    }

    #[test]
    fn corrupted_map_fails_verification() {
        let (mut store, [root, _, _, c, _]) = tree();
        store.set_independent(c.idx, true);
        store.associations[root.idx as usize].remove(c.idx);
        assert!(matches!(
            store.verify(),
            Err(InvariantViolation::Association(_))
        ));
    }
}
