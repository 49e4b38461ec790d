// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relation insertion and removal, cycle resolution, and retesting of
//! suspended relation sets.
//!
//! A candidate pair is activated unless some active path leads from its
//! `above` element back to its `below` element while consisting only of
//! relations at least as strong as the candidate. Paths containing a weaker
//! link are broken by suspending their weakest relation. Because the outcome
//! only depends on the existence of such a path, the order in which paths
//! are found does not change which relations end up active.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use super::relation::{AddOutcome, Member, Priority, Relation, RelationSet};
use super::{ElementKey, OrderingGraph};

/// Result of trying to realize the strongest member of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Activation {
    /// The pair is active; `displaced` weaker relations were suspended.
    Activated { displaced: usize },
    /// An equally strong or stronger path closes the cycle.
    Blocked,
}

impl<K: ElementKey> OrderingGraph<K> {
    /// Records `relation` and realizes it if possible.
    ///
    /// See [`AddOutcome`] for the possible results. A relation that is not
    /// realized stays recorded: it takes over when the active relation of its
    /// pair is removed, or is retried by
    /// [`retest_suspended`](Self::retest_suspended) once the cycle that
    /// rejected it is broken.
    pub fn add_relation(&mut self, relation: Relation<K>) -> AddOutcome {
        let pair = (relation.below, relation.above);
        if pair.0 == pair.1 {
            return AddOutcome::SelfLoop;
        }
        let member = Member {
            priority: relation.priority,
            embedded: relation.embedded,
            origin: relation.origin,
            active: false,
        };
        let suspended = self.suspended.contains(&pair);
        let set = self.sets.entry(pair).or_default();
        if set.find(member.priority, member.embedded).is_some() {
            return AddOutcome::AlreadyPresent;
        }

        if let Some(active_idx) = set.active_index() {
            let previous = set.members[active_idx];
            if previous.priority >= member.priority {
                set.insert(member);
                return AddOutcome::Shadowed;
            }
            // The edge already exists; only its strength changes.
            set.members[active_idx].active = false;
            let successor = Member {
                active: true,
                ..member
            };
            set.insert(successor);
            self.notify(pair, previous, false);
            self.notify(pair, successor, true);
            if previous.embedded != successor.embedded {
                self.relax(&[pair.1]);
            }
            tracing::trace!(?pair, priority = ?member.priority, "stronger relation took over");
            return AddOutcome::Activated;
        }

        if suspended
            && set
                .strongest()
                .is_some_and(|strongest| strongest.priority >= member.priority)
        {
            set.insert(member);
            return AddOutcome::Rejected;
        }

        set.insert(member);
        match self.try_activate(pair) {
            Activation::Activated { displaced } => {
                if displaced > 0 {
                    self.retest_suspended();
                }
                AddOutcome::Activated
            }
            Activation::Blocked => AddOutcome::Rejected,
        }
    }

    /// Removes `relation` and returns whether it was recorded.
    ///
    /// Removing the active relation of a pair hands the pair over to an
    /// equally strong sibling if one exists. Otherwise the edge disappears,
    /// remaining weaker members of the pair are suspended, and every
    /// suspended pair is retested.
    pub fn remove_relation(&mut self, relation: &Relation<K>) -> bool {
        let pair = (relation.below, relation.above);
        let Some(set) = self.sets.get_mut(&pair) else {
            return false;
        };
        let Some(idx) = set.find(relation.priority, relation.embedded) else {
            return false;
        };
        let removed = set.members.remove(idx);

        if !removed.active {
            if set.is_empty() {
                self.sets.remove(&pair);
                self.suspended.remove(&pair);
            }
            return true;
        }

        if let Some(sibling) = set
            .members
            .iter()
            .position(|m| m.priority == removed.priority)
        {
            set.members[sibling].active = true;
            let successor = set.members[sibling];
            self.notify(pair, removed, false);
            self.notify(pair, successor, true);
            if successor.embedded != removed.embedded {
                self.relax(&[pair.1]);
            }
            return true;
        }

        if set.is_empty() {
            self.sets.remove(&pair);
        } else {
            set.blocking.clear();
            self.suspended.insert(pair);
        }
        self.unlink(pair);
        self.release_if_isolated(pair.0);
        self.release_if_isolated(pair.1);
        self.notify(pair, removed, false);
        tracing::trace!(?pair, "relation deactivated");
        self.retest_suspended();
        true
    }

    /// Tries to reactivate every suspended pair, strongest first, until no
    /// further pair can be activated. Returns the number of activations.
    ///
    /// Pairs whose recorded blocking relations are all still active and at
    /// least as strong are skipped without a search.
    pub fn retest_suspended(&mut self) -> usize {
        let mut reactivated = 0;
        loop {
            let mut order: Vec<(Priority, (K, K))> = self
                .suspended
                .iter()
                .filter_map(|&pair| {
                    self.sets
                        .get(&pair)
                        .and_then(RelationSet::strongest)
                        .map(|m| (m.priority, pair))
                })
                .collect();
            order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let mut progressed = false;
            for (priority, pair) in order {
                if !self.suspended.contains(&pair) || self.still_blocked(pair, priority) {
                    continue;
                }
                if let Activation::Activated { .. } = self.try_activate(pair) {
                    reactivated += 1;
                    progressed = true;
                }
            }
            if !progressed {
                return reactivated;
            }
        }
    }

    // -- Cycle resolution --

    /// Realizes the strongest member of `pair`, suspending weaker relations
    /// that close a cycle with it. Leaves the graph unchanged when blocked.
    fn try_activate(&mut self, pair: (K, K)) -> Activation {
        let Some(candidate) = self.sets.get(&pair).and_then(RelationSet::strongest) else {
            return Activation::Blocked;
        };
        let (below, above) = pair;

        // Tentatively unlinked relations with the path each one was on.
        let mut displaced: Vec<((K, K), Vec<(K, K)>)> = Vec::new();
        while let Some(path) = self.cycle_path(below, above) {
            let Some((weakest_priority, weakest)) = self.weakest_on(&path) else {
                break;
            };
            if weakest_priority >= candidate.priority {
                for &(victim, _) in displaced.iter().rev() {
                    self.link(victim);
                }
                if !displaced.is_empty() {
                    tracing::debug!(?pair, restored = displaced.len(), "rolled back displacement");
                }
                tracing::debug!(?pair, priority = ?candidate.priority, "relation rejected by cycle");
                if let Some(set) = self.sets.get_mut(&pair) {
                    set.blocking = path;
                }
                self.suspended.insert(pair);
                return Activation::Blocked;
            }
            self.unlink(weakest);
            displaced.push((weakest, path));
        }

        if let Some(set) = self.sets.get_mut(&pair) {
            set.members[0].active = true;
            set.blocking.clear();
        }
        self.suspended.remove(&pair);
        self.link(pair);

        let count = displaced.len();
        for (victim, path) in displaced {
            let Some(set) = self.sets.get_mut(&victim) else {
                continue;
            };
            let Some(idx) = set.active_index() else {
                continue;
            };
            set.members[idx].active = false;
            let member = set.members[idx];
            set.blocking = path.into_iter().filter(|&p| p != victim).collect();
            set.blocking.push(pair);
            self.suspended.insert(victim);
            self.release_if_isolated(victim.0);
            self.release_if_isolated(victim.1);
            self.notify(victim, member, false);
            tracing::debug!(?victim, by = ?pair, "relation displaced");
        }

        self.relax(&[below, above]);
        let activated = Member {
            active: true,
            ..candidate
        };
        self.notify(pair, activated, true);
        tracing::trace!(?pair, priority = ?candidate.priority, "relation activated");
        Activation::Activated { displaced: count }
    }

    /// Returns whether the recorded blocking pairs of `pair` still form a
    /// cycle at least as strong as `priority`.
    fn still_blocked(&self, pair: (K, K), priority: Priority) -> bool {
        let Some(set) = self.sets.get(&pair) else {
            return false;
        };
        !set.blocking.is_empty()
            && set
                .blocking
                .iter()
                .all(|&p| self.active_priority(p).is_some_and(|q| q >= priority))
    }

    /// Returns the path of active pairs that would close a cycle with the
    /// edge `below -> above`, if any.
    fn cycle_path(&self, below: K, above: K) -> Option<Vec<(K, K)>> {
        let (Some(low), Some(high)) = (self.vertices.get(&below), self.vertices.get(&above))
        else {
            return None;
        };
        if low.below.is_empty() || high.above.is_empty() {
            return None;
        }
        if let (Some(lb), Some(la)) = (self.layer(below), self.layer(above)) {
            if la > lb {
                return None;
            }
        }
        self.find_path(above, below)
    }

    /// Weakest active pair on `path`; ties resolve to the smallest pair.
    fn weakest_on(&self, path: &[(K, K)]) -> Option<(Priority, (K, K))> {
        path.iter()
            .filter_map(|&p| self.active_priority(p).map(|q| (q, p)))
            .min()
    }

    /// Shortest path of active pairs leading upward from `from` to `to`.
    ///
    /// Elements above `to`'s layer cannot lie on such a path and are not
    /// explored.
    pub(crate) fn find_path(&self, from: K, to: K) -> Option<Vec<(K, K)>> {
        if !self.vertices.contains_key(&from) || !self.vertices.contains_key(&to) {
            return None;
        }
        let ceiling = self.layer(to);
        let mut parents: BTreeMap<K, K> = BTreeMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(vertex) = self.vertices.get(&current) else {
                continue;
            };
            for &next in &vertex.above {
                if next == from || parents.contains_key(&next) {
                    continue;
                }
                if let (Some(ceiling), Some(level)) = (ceiling, self.layer(next)) {
                    if level > ceiling {
                        continue;
                    }
                }
                parents.insert(next, current);
                if next == to {
                    let mut path = Vec::new();
                    let mut at = to;
                    while at != from {
                        let prev = parents[&at];
                        path.push((prev, at));
                        at = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    // -- Adjacency --

    /// Adds the edge to both vertices. New vertices start at layer 0.
    fn link(&mut self, (below, above): (K, K)) {
        for key in [below, above] {
            if !self.vertices.contains_key(&key) {
                self.vertices.insert(key, super::Vertex::default());
                self.set_layer(key, 0);
            }
        }
        if let Some(v) = self.vertices.get_mut(&below) {
            v.above.insert(above);
        }
        if let Some(v) = self.vertices.get_mut(&above) {
            v.below.insert(below);
        }
    }

    /// Removes the edge from both vertices, keeping them and their layers.
    fn unlink(&mut self, (below, above): (K, K)) {
        if let Some(v) = self.vertices.get_mut(&below) {
            v.above.remove(&above);
        }
        if let Some(v) = self.vertices.get_mut(&above) {
            v.below.remove(&below);
        }
    }

    /// Drops `key` and its layer value once it has no active relation.
    fn release_if_isolated(&mut self, key: K) {
        if self.vertices.get(&key).is_some_and(super::Vertex::is_isolated) {
            self.vertices.remove(&key);
            if self.layers.remove(&key).is_some() {
                self.changed.insert(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::trace::ChangeObserver;

    fn rel(below: char, above: char, priority: i32) -> Relation<char> {
        Relation::new(below, above, Priority::new(priority))
    }

    fn layer(graph: &OrderingGraph<char>, key: char) -> i32 {
        graph.layer(key).unwrap()
    }

    #[derive(Default)]
    struct Events(Rc<RefCell<Vec<(char, char, i32, bool)>>>);

    impl ChangeObserver<char> for Events {
        fn on_relation_changed(&mut self, relation: &Relation<char>, active: bool) {
            self.0.borrow_mut().push((
                relation.below,
                relation.above,
                relation.priority.get(),
                active,
            ));
        }
    }

    #[test]
    fn weakest_relation_of_a_cycle_is_suspended() {
        let mut graph = OrderingGraph::new();
        assert_eq!(graph.add_relation(rel('a', 'b', 10)), AddOutcome::Activated);
        assert_eq!(graph.add_relation(rel('b', 'c', 10)), AddOutcome::Activated);
        assert_eq!(graph.add_relation(rel('c', 'a', 5)), AddOutcome::Rejected);

        assert!(graph.is_suspended('c', 'a'));
        assert!(!graph.is_active(&rel('c', 'a', 5)));
        assert!(layer(&graph, 'a') < layer(&graph, 'b'));
        assert!(layer(&graph, 'b') < layer(&graph, 'c'));
        assert_eq!(
            graph.blocking('c', 'a').collect::<Vec<_>>(),
            [('a', 'b'), ('b', 'c')]
        );
        graph.verify().unwrap();
    }

    #[test]
    fn removing_a_blocker_reactivates_the_suspended_relation() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'c', 10));
        graph.add_relation(rel('c', 'a', 5));

        assert!(graph.remove_relation(&rel('a', 'b', 10)));
        assert!(graph.is_active(&rel('c', 'a', 5)));
        assert!(!graph.is_suspended('c', 'a'));
        assert!(layer(&graph, 'c') < layer(&graph, 'a'));
        assert!(!graph.has_path('a', 'b'));
        assert!(!graph.is_isolated('b'));
        graph.verify().unwrap();

        // `b` is isolated only once `(b, c)` goes too, not after `(a, b)` alone.
        assert!(graph.remove_relation(&rel('b', 'c', 10)));
        assert!(graph.is_isolated('b'));
        assert_eq!(graph.layer('b'), None);
        graph.verify().unwrap();
    }

    #[test]
    fn stronger_candidate_displaces_the_weakest_link() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'c', 3));
        assert_eq!(graph.add_relation(rel('c', 'a', 5)), AddOutcome::Activated);

        assert!(graph.is_suspended('b', 'c'));
        assert!(graph.is_active(&rel('c', 'a', 5)));
        assert!(layer(&graph, 'c') < layer(&graph, 'a'));
        assert!(layer(&graph, 'a') < layer(&graph, 'b'));
        graph.verify().unwrap();

        // Removing the displacer restores the displaced relation.
        graph.remove_relation(&rel('c', 'a', 5));
        assert!(graph.is_active(&rel('b', 'c', 3)));
        assert!(graph.suspended().next().is_none());
        graph.verify().unwrap();
    }

    #[test]
    fn displacement_is_rolled_back_when_a_strong_path_remains() {
        let mut graph = OrderingGraph::new();
        // Two routes from `a` up to `d`: a weak direct one and a strong detour.
        graph.add_relation(rel('a', 'd', 1));
        graph.add_relation(rel('a', 'b', 9));
        graph.add_relation(rel('b', 'c', 9));
        graph.add_relation(rel('c', 'd', 9));

        assert_eq!(graph.add_relation(rel('d', 'a', 5)), AddOutcome::Rejected);
        assert!(graph.is_active(&rel('a', 'd', 1)));
        assert!(graph.has_path('a', 'd'));
        assert!(graph.is_suspended('d', 'a'));
        graph.verify().unwrap();
    }

    #[test]
    fn ties_favour_the_incumbent() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 4));
        assert_eq!(graph.add_relation(rel('b', 'a', 4)), AddOutcome::Rejected);
        assert!(graph.is_active(&rel('a', 'b', 4)));
    }

    #[test]
    fn weaker_duplicate_is_shadowed() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 5));
        assert_eq!(graph.add_relation(rel('a', 'b', 5)), AddOutcome::AlreadyPresent);
        assert_eq!(graph.add_relation(rel('a', 'b', 2)), AddOutcome::Shadowed);
        assert!(!graph.is_active(&rel('a', 'b', 2)));
        assert!(graph.contains(&rel('a', 'b', 2)));
        graph.verify().unwrap();
    }

    #[test]
    fn stronger_duplicate_takes_over_without_moving_layers() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 2));
        let _ = graph.drain_changed();
        assert_eq!(graph.add_relation(rel('a', 'b', 8)), AddOutcome::Activated);
        assert!(graph.is_active(&rel('a', 'b', 8)));
        assert!(!graph.is_active(&rel('a', 'b', 2)));
        assert!(graph.drain_changed().is_empty());

        // Removing the strong one falls back to the weak one.
        graph.remove_relation(&rel('a', 'b', 8));
        assert!(graph.is_active(&rel('a', 'b', 2)));
        assert!(graph.has_path('a', 'b'));
        graph.verify().unwrap();
    }

    #[test]
    fn equal_priority_sibling_takes_over_silently() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 3));
        graph.add_relation(rel('a', 'b', 3).with_embedded(true));
        graph.set_observer(Some(Box::new(Events(events.clone()))));

        graph.remove_relation(&rel('a', 'b', 3));
        assert!(graph.is_active(&rel('a', 'b', 3).with_embedded(true)));
        assert!(graph.has_path('a', 'b'));
        assert_eq!(
            *events.borrow(),
            [('a', 'b', 3, false), ('a', 'b', 3, true)]
        );
    }

    #[test]
    fn removing_unknown_relations_is_a_no_op() {
        let mut graph = OrderingGraph::new();
        assert!(!graph.remove_relation(&rel('a', 'b', 1)));
        graph.add_relation(rel('a', 'b', 1));
        assert!(!graph.remove_relation(&rel('a', 'b', 2)));
        assert!(graph.remove_relation(&rel('a', 'b', 1)));
        assert!(!graph.remove_relation(&rel('a', 'b', 1)));
        assert_eq!(graph.pair_count(), 0);
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut graph = OrderingGraph::new();
        assert_eq!(graph.add_relation(rel('a', 'a', 1)), AddOutcome::SelfLoop);
        assert_eq!(graph.pair_count(), 0);
    }

    #[test]
    fn weaker_addition_to_suspended_pair_stays_suspended() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'a', 5));
        assert_eq!(graph.add_relation(rel('b', 'a', 1)), AddOutcome::Rejected);
        // A stronger one breaks through.
        assert_eq!(graph.add_relation(rel('b', 'a', 20)), AddOutcome::Activated);
        assert!(graph.is_suspended('a', 'b'));
        assert!(layer(&graph, 'b') < layer(&graph, 'a'));
        graph.verify().unwrap();
    }

    #[test]
    fn retest_prefers_the_strongest_suspended_pair() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'a', 3));
        graph.add_relation(rel('b', 'a', 7).with_embedded(true));
        assert!(graph.is_suspended('b', 'a'));

        graph.remove_relation(&rel('a', 'b', 10));
        let active = graph.active_relation('b', 'a').unwrap();
        assert_eq!(active.priority.get(), 7);
        assert!(active.embedded);
        graph.verify().unwrap();
    }

    #[test]
    fn observer_sees_activation_and_displacement() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut graph = OrderingGraph::new();
        graph.set_observer(Some(Box::new(Events(events.clone()))));

        graph.add_relation(rel('a', 'b', 1));
        graph.add_relation(rel('b', 'a', 2));
        assert_eq!(
            *events.borrow(),
            [
                ('a', 'b', 1, true),
                ('a', 'b', 1, false),
                ('b', 'a', 2, true),
            ]
        );
    }

    #[test]
    fn path_search_returns_the_shortest_route() {
        let mut graph = OrderingGraph::new();
        graph.add_relation(rel('a', 'b', 1));
        graph.add_relation(rel('b', 'c', 1));
        graph.add_relation(rel('c', 'd', 1));
        graph.add_relation(rel('a', 'd', 1));
        assert_eq!(graph.find_path('a', 'd'), Some(Vec::from([('a', 'd')])));
        assert_eq!(graph.find_path('d', 'a'), None);
    }
}
