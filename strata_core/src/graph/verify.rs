// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural consistency check.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::format;

use super::relation::RelationSet;
use super::{ElementKey, OrderingGraph};
use crate::error::InvariantViolation;

impl<K: ElementKey> OrderingGraph<K> {
    /// Checks every structural invariant of the graph.
    ///
    /// Walks all relation sets, vertices, and layer values, so it is meant
    /// for tests and debugging rather than the hot path.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant found.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        for (&pair, set) in &self.sets {
            let Some(strongest) = set.strongest() else {
                return Err(InvariantViolation::EmptySet(format!("{pair:?}")));
            };
            let count = set.members.iter().filter(|m| m.active).count();
            if count > 1 {
                return Err(InvariantViolation::MultipleActive {
                    pair: format!("{pair:?}"),
                    count,
                });
            }
            let suspended = self.suspended.contains(&pair);
            match set.active() {
                Some(active) => {
                    if suspended {
                        return Err(InvariantViolation::ActiveAndSuspended(format!("{pair:?}")));
                    }
                    if strongest.priority > active.priority {
                        return Err(InvariantViolation::WeakerActive(format!("{pair:?}")));
                    }
                    let linked = self
                        .vertices
                        .get(&pair.0)
                        .is_some_and(|v| v.above.contains(&pair.1));
                    if !linked {
                        return Err(InvariantViolation::Adjacency(format!("{pair:?}")));
                    }
                }
                None if !suspended => {
                    return Err(InvariantViolation::NotSuspended(format!("{pair:?}")));
                }
                None => {}
            }
        }
        if let Some(pair) = self.suspended.iter().find(|p| !self.sets.contains_key(*p)) {
            return Err(InvariantViolation::EmptySet(format!("{pair:?}")));
        }

        for (&key, vertex) in &self.vertices {
            if vertex.is_isolated() {
                return Err(InvariantViolation::Adjacency(format!("{key:?}")));
            }
            let upward = vertex.above.iter().all(|&up| {
                self.active_relation(key, up).is_some()
                    && self.vertices.get(&up).is_some_and(|v| v.below.contains(&key))
            });
            let downward = vertex.below.iter().all(|&down| {
                self.active_relation(down, key).is_some()
                    && self.vertices.get(&down).is_some_and(|v| v.above.contains(&key))
            });
            if !upward || !downward {
                return Err(InvariantViolation::Adjacency(format!("{key:?}")));
            }
        }

        if let Some(key) = self
            .layers
            .keys()
            .chain(self.vertices.keys())
            .find(|k| self.vertices.contains_key(*k) != self.layers.contains_key(*k))
        {
            return Err(InvariantViolation::Layer(format!("{key:?}")));
        }
        for (&pair, set) in &self.sets {
            let Some(active) = set.active() else {
                continue;
            };
            let (Some(low), Some(high)) = (self.layer(pair.0), self.layer(pair.1)) else {
                return Err(InvariantViolation::Layer(format!("{pair:?}")));
            };
            let satisfied = if active.embedded {
                high >= low
            } else {
                high > low
            };
            if !satisfied {
                return Err(InvariantViolation::Layer(format!(
                    "{pair:?} ({low} -> {high})"
                )));
            }
        }

        self.verify_acyclic()
    }

    fn verify_acyclic(&self) -> Result<(), InvariantViolation> {
        let mut pending: BTreeMap<K, usize> = self
            .vertices
            .iter()
            .map(|(&key, vertex)| (key, vertex.below.len()))
            .collect();
        let mut queue: VecDeque<K> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&key, _)| key)
            .collect();
        while let Some(key) = queue.pop_front() {
            pending.remove(&key);
            let Some(vertex) = self.vertices.get(&key) else {
                continue;
            };
            for up in &vertex.above {
                if let Some(n) = pending.get_mut(up) {
                    *n -= 1;
                    if *n == 0 {
                        queue.push_back(*up);
                    }
                }
            }
        }
        match pending.keys().next() {
            Some(key) => Err(InvariantViolation::Cycle(format!("{key:?}"))),
            None => Ok(()),
        }
    }

    /// Number of active relations, for diagnostics.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sets
            .values()
            .filter(|set| RelationSet::active(set).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Priority, Relation};

    fn rel(below: char, above: char, priority: i32) -> Relation<char> {
        Relation::new(below, above, Priority::new(priority))
    }

    fn triangle() -> OrderingGraph<char> {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'c', 10));
        graph.add_relation(rel('c', 'a', 5));
        graph
    }

    #[test]
    fn consistent_graph_verifies() {
        let graph = triangle();
        assert_eq!(graph.verify(), Ok(()));
        assert_eq!(graph.active_count(), 2);
    }

    #[test]
    fn lowered_layer_is_reported() {
        let mut graph = triangle();
        graph.layers.insert('c', 0);
        assert!(matches!(graph.verify(), Err(InvariantViolation::Layer(_))));
    }

    #[test]
    fn active_suspended_pair_is_reported() {
        let mut graph = triangle();
        graph.suspended.insert(('a', 'b'));
        assert!(matches!(
            graph.verify(),
            Err(InvariantViolation::ActiveAndSuspended(_))
        ));
    }

    #[test]
    fn unsuspended_inactive_pair_is_reported() {
        let mut graph = triangle();
        graph.suspended.remove(&('c', 'a'));
        assert!(matches!(
            graph.verify(),
            Err(InvariantViolation::NotSuspended(_))
        ));
    }

    #[test]
    fn forced_cycle_is_reported() {
        let mut graph = triangle();
        if let Some(set) = graph.sets.get_mut(&('c', 'a')) {
            set.members[0].active = true;
        }
        graph.suspended.remove(&('c', 'a'));
        if let Some(v) = graph.vertices.get_mut(&'c') {
            v.above.insert('a');
        }
        if let Some(v) = graph.vertices.get_mut(&'a') {
            v.below.insert('c');
        }
        graph.layers.insert('a', 3);
        graph.layers.insert('b', 4);
        graph.layers.insert('c', 5);
        // Layers cannot satisfy a cycle; the first failing check wins.
        assert!(graph.verify().is_err());
        assert!(matches!(
            graph.verify_acyclic(),
            Err(InvariantViolation::Cycle(_))
        ));
    }

    #[test]
    fn empty_set_is_reported() {
        let mut graph = triangle();
        if let Some(set) = graph.sets.get_mut(&('c', 'a')) {
            set.members.clear();
        }
        assert!(matches!(graph.verify(), Err(InvariantViolation::EmptySet(_))));
    }
}
