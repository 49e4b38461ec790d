// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Default order of participants without a known relative order.

use core::cmp::Ordering;
use core::fmt;

use crate::stack::{ParticipantId, ParticipantStore};

/// Orders two participants when neither the ordering graph nor their layer
/// values decide it. `Less` means `a` renders below `b`.
///
/// Only consulted when a tie-break edge between two independent siblings is
/// synthesized for the first time.
pub trait DefaultOrder: fmt::Debug {
    /// Compares two live participants.
    fn compare(&self, store: &ParticipantStore, a: ParticipantId, b: ParticipantId) -> Ordering;
}

/// Containment order: depth-first pre-order of the tree, so earlier siblings
/// render below later ones and parents below their children.
///
/// Unattached participants sort last; remaining ties fall back to handle
/// order.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeOrder;

impl DefaultOrder for TreeOrder {
    fn compare(&self, store: &ParticipantStore, a: ParticipantId, b: ParticipantId) -> Ordering {
        let rank = |id| store.traversal_rank(id).unwrap_or(u32::MAX);
        rank(a).cmp(&rank(b)).then(a.cmp(&b))
    }
}

/// Reverse containment order: later siblings render below earlier ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseTreeOrder;

impl DefaultOrder for ReverseTreeOrder {
    fn compare(&self, store: &ParticipantStore, a: ParticipantId, b: ParticipantId) -> Ordering {
        TreeOrder.compare(store, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_order_follows_pre_order() {
        let mut store = ParticipantStore::new();
        let root = store.create();
        let first = store.create();
        let second = store.create();
        store.attach(root, None);
        store.attach(first, Some(root));
        store.attach(second, Some(root));
        let _ = store.evaluate();

        assert_eq!(TreeOrder.compare(&store, first, second), Ordering::Less);
        assert_eq!(TreeOrder.compare(&store, root, first), Ordering::Less);
        assert_eq!(ReverseTreeOrder.compare(&store, first, second), Ordering::Greater);
    }

    #[test]
    fn unattached_participants_sort_last() {
        let mut store = ParticipantStore::new();
        let loose = store.create();
        let root = store.create();
        store.attach(root, None);
        let _ = store.evaluate();
        assert_eq!(TreeOrder.compare(&store, loose, root), Ordering::Greater);
    }
}
