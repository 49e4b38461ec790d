// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Prioritized ordering graph.
//!
//! The graph holds "`above` renders over `below`" [`Relation`]s between
//! opaque element keys and keeps a consistent subset of them *active*:
//!
//! - At most one relation per ordered pair is active, always the strongest
//!   one that does not close a cycle.
//! - The active relations form a DAG. When a new relation would close a
//!   cycle, the weakest relations on the cycle are set aside (*suspended*)
//!   and retried whenever the graph changes.
//! - Every element touched by an active relation carries an integer layer
//!   value satisfying all active relations: strictly higher than what it is
//!   above, or at least equal for [`embedded`](Relation::embedded) ones.
//!
//! Layer values are propagated incrementally and only ever rise;
//! [`minimize`](OrderingGraph::minimize) compacts them. Mutations of the
//! layer map are collected until [`drain_changed`](OrderingGraph::drain_changed).
//!
//! The graph knows nothing about containment; see
//! [`stack`](crate::stack) and [`translator`](crate::translator).

mod activate;
mod layers;
mod relation;
mod verify;

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt;

pub use relation::{AddOutcome, Origin, Priority, Relation};

use relation::{Member, RelationSet};

use crate::trace::ChangeObserver;

/// Requirements on element keys.
pub trait ElementKey: Copy + Ord + fmt::Debug {}

impl<T: Copy + Ord + fmt::Debug> ElementKey for T {}

/// Active adjacency of one element.
#[derive(Clone, Debug)]
pub(crate) struct Vertex<K> {
    /// Elements directly above, through an active relation.
    pub(crate) above: BTreeSet<K>,
    /// Elements directly below, through an active relation.
    pub(crate) below: BTreeSet<K>,
}

impl<K> Default for Vertex<K> {
    fn default() -> Self {
        Self {
            above: BTreeSet::new(),
            below: BTreeSet::new(),
        }
    }
}

impl<K> Vertex<K> {
    fn is_isolated(&self) -> bool {
        self.above.is_empty() && self.below.is_empty()
    }
}

/// Directed graph of prioritized relations with cycle resolution and layer
/// assignment.
pub struct OrderingGraph<K> {
    pub(crate) vertices: BTreeMap<K, Vertex<K>>,
    pub(crate) sets: BTreeMap<(K, K), RelationSet<K>>,
    pub(crate) suspended: BTreeSet<(K, K)>,
    pub(crate) layers: BTreeMap<K, i32>,
    pub(crate) changed: BTreeSet<K>,
    observer: Option<Box<dyn ChangeObserver<K>>>,
}

impl<K: fmt::Debug> fmt::Debug for OrderingGraph<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingGraph")
            .field("vertices", &self.vertices.len())
            .field("sets", &self.sets.len())
            .field("suspended", &self.suspended)
            .field("layers", &self.layers)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

impl<K: ElementKey> Default for OrderingGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ElementKey> OrderingGraph<K> {
    /// Creates an empty graph without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: BTreeMap::new(),
            sets: BTreeMap::new(),
            suspended: BTreeSet::new(),
            layers: BTreeMap::new(),
            changed: BTreeSet::new(),
            observer: None,
        }
    }

    /// Installs `observer`, returning the previous one.
    pub fn set_observer(
        &mut self,
        observer: Option<Box<dyn ChangeObserver<K>>>,
    ) -> Option<Box<dyn ChangeObserver<K>>> {
        core::mem::replace(&mut self.observer, observer)
    }

    /// Returns the installed observer, if any.
    pub fn observer_mut(&mut self) -> Option<&mut (dyn ChangeObserver<K> + 'static)> {
        self.observer.as_deref_mut()
    }

    // -- Queries --

    /// Returns the layer value of `key`, or `None` when it is isolated.
    #[must_use]
    pub fn layer(&self, key: K) -> Option<i32> {
        self.layers.get(&key).copied()
    }

    /// Returns the highest layer value in the graph.
    #[must_use]
    pub fn max_layer(&self) -> Option<i32> {
        self.layers.values().copied().max()
    }

    /// Returns every element with a layer value, in key order.
    pub fn layers(&self) -> impl Iterator<Item = (K, i32)> + '_ {
        self.layers.iter().map(|(&k, &v)| (k, v))
    }

    /// Returns whether `key` has no active relation.
    #[must_use]
    pub fn is_isolated(&self, key: K) -> bool {
        self.vertices.get(&key).is_none_or(Vertex::is_isolated)
    }

    /// Returns whether `above` can be reached from `below` through active
    /// relations, i.e. whether `above` is currently ordered over `below`.
    ///
    /// An element is never above itself.
    #[must_use]
    pub fn has_path(&self, below: K, above: K) -> bool {
        below != above && self.find_path(below, above).is_some()
    }

    /// Returns the active relation of the pair, if any.
    #[must_use]
    pub fn active_relation(&self, below: K, above: K) -> Option<Relation<K>> {
        let pair = (below, above);
        self.sets
            .get(&pair)
            .and_then(RelationSet::active)
            .map(|m| m.relation(pair))
    }

    /// Returns every relation recorded for the pair, strongest first.
    pub fn relations(&self, below: K, above: K) -> impl Iterator<Item = Relation<K>> + '_ {
        let pair = (below, above);
        self.sets
            .get(&pair)
            .into_iter()
            .flat_map(move |set| set.members.iter().map(move |m| m.relation(pair)))
    }

    /// Returns every recorded relation with whether it is active, in pair
    /// order.
    pub fn all_relations(&self) -> impl Iterator<Item = (Relation<K>, bool)> + '_ {
        self.sets.iter().flat_map(|(&pair, set)| {
            set.members
                .iter()
                .map(move |m| (m.relation(pair), m.active))
        })
    }

    /// Returns whether this exact relation is recorded and active.
    #[must_use]
    pub fn is_active(&self, relation: &Relation<K>) -> bool {
        self.member(relation).is_some_and(|m| m.active)
    }

    /// Returns whether this exact relation is recorded.
    #[must_use]
    pub fn contains(&self, relation: &Relation<K>) -> bool {
        self.member(relation).is_some()
    }

    /// Returns whether the pair has recorded relations but none is active.
    #[must_use]
    pub fn is_suspended(&self, below: K, above: K) -> bool {
        self.suspended.contains(&(below, above))
    }

    /// Returns the suspended pairs in key order.
    pub fn suspended(&self) -> impl Iterator<Item = (K, K)> + '_ {
        self.suspended.iter().copied()
    }

    /// Returns the pairs that kept `(below, above)` suspended when it was
    /// last tested.
    pub fn blocking(&self, below: K, above: K) -> impl Iterator<Item = (K, K)> + '_ {
        self.sets
            .get(&(below, above))
            .into_iter()
            .flat_map(|set| set.blocking.iter().copied())
    }

    /// Returns the number of elements with at least one active relation.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of pairs with at least one recorded relation.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.sets.len()
    }

    /// Propagates pending layer changes and returns every element whose
    /// layer value changed since the previous drain, in key order.
    pub fn drain_changed(&mut self) -> Vec<K> {
        core::mem::take(&mut self.changed).into_iter().collect()
    }

    // -- Internal helpers --

    fn member(&self, relation: &Relation<K>) -> Option<Member> {
        let set = self.sets.get(&(relation.below, relation.above))?;
        set.find(relation.priority, relation.embedded)
            .map(|idx| set.members[idx])
    }

    pub(crate) fn active_priority(&self, pair: (K, K)) -> Option<Priority> {
        self.sets
            .get(&pair)
            .and_then(RelationSet::active)
            .map(|m| m.priority)
    }

    fn notify(&mut self, pair: (K, K), member: Member, active: bool) {
        if let Some(observer) = &mut self.observer {
            observer.on_relation_changed(&member.relation(pair), active);
        }
    }
}
