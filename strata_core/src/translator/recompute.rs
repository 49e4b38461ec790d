// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recompute passes: settling independence, embedding edges, tie-breaks, and
//! evaluation of the containment tree.

use alloc::format;
use alloc::vec::Vec;
use core::cmp::Ordering;

use super::element::ElementId;
use super::{EdgeKey, TieBreak, Translator, is_root_group};
use crate::error::InvariantViolation;
use crate::graph::{Origin, Priority};
use crate::stack::{INVALID, ParticipantId, StackChanges, Status};
use crate::trace::RecomputeSummary;

impl Translator {
    /// Settles every participant marked since the last pass, brings
    /// tie-breaks up to date, and re-evaluates the containment tree.
    ///
    /// # Panics
    ///
    /// Panics if [`TranslatorConfig::verify`](super::TranslatorConfig::verify)
    /// is set and the resulting state is inconsistent.
    pub fn recompute(&mut self) -> StackChanges {
        let mut changes = StackChanges::default();
        self.recompute_into(&mut changes);
        changes
    }

    /// Like [`recompute`](Self::recompute), but reuses a caller-provided
    /// buffer.
    ///
    /// # Panics
    ///
    /// See [`recompute`](Self::recompute).
    pub fn recompute_into(&mut self, changes: &mut StackChanges) {
        self.pass += 1;
        let mut summary = RecomputeSummary {
            pass: self.pass,
            ..RecomputeSummary::default()
        };
        self.store.refresh_traversal();
        self.settle(&mut summary);

        if self.config.tie_breaks {
            self.sync_tie_breaks(&mut summary);
        } else {
            let all: Vec<_> = self.tie_breaks.keys().copied().collect();
            for key in all {
                self.drop_tie_break(key, &mut summary);
            }
            // Every group has to be rebuilt once tie-breaks are enabled again.
            self.touch_all_groups();
        }

        if self.needs_recompute && self.config.minimize.should_minimize(self.graph.max_layer()) {
            self.graph.minimize();
            summary.minimized = true;
        }

        for element in self.graph.drain_changed() {
            let ElementId::Participant(id) = element else {
                continue;
            };
            if self.store.is_alive(id) && self.store.is_attached(id) && self.store.is_independent(id)
            {
                self.store.set_own_layer(id.idx, self.graph.layer(element));
            }
        }
        self.store.evaluate_into(changes);

        summary.layers_changed = count(changes.layers.len());
        summary.suspended = count(self.graph.suspended().count());
        if let Some(observer) = self.graph.observer_mut() {
            observer.on_recompute(&summary);
        }
        tracing::debug!(
            pass = summary.pass,
            settled = summary.settled,
            independent = summary.became_independent,
            inherited = summary.became_inherited,
            tie_breaks_added = summary.tie_breaks_added,
            tie_breaks_removed = summary.tie_breaks_removed,
            minimized = summary.minimized,
            layers_changed = summary.layers_changed,
            suspended = summary.suspended,
            "recompute"
        );
        self.needs_recompute = false;

        if self.config.verify {
            if let Err(violation) = self.verify() {
                panic!("inconsistent state after pass {}: {violation}", self.pass);
            }
        }
    }

    /// Checks the graph, the tree, and the bookkeeping between them.
    ///
    /// Own layer values are only refreshed by a recompute, so this is meant
    /// to be called right after one.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant found.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.graph.verify()?;
        self.store.verify()?;

        for (key, &count) in &self.edges {
            if count == 0 || !self.graph.contains(&key.relation(Origin::Declared)) {
                return Err(InvariantViolation::Reference(format!("{key:?}")));
            }
        }
        if let Some(tie) = self
            .tie_breaks
            .values()
            .find(|tie| !self.edges.contains_key(&tie.edge))
        {
            return Err(InvariantViolation::Reference(format!("{:?}", tie.edge)));
        }

        for idx in 0..self.store.capacity() {
            let Some(id) = self.store.id_at(idx) else {
                continue;
            };
            if !self.store.is_attached(id) {
                continue;
            }
            let independent = self.store.is_independent(id);
            if self.store.status(id) != Status::MarkedDirty && independent != (self.degree(id) > 0)
            {
                return Err(InvariantViolation::Inheritance(format!(
                    "{id:?} has {} declared pairs",
                    self.degree(id)
                )));
            }
            let want = if independent {
                self.graph.layer(ElementId::Participant(id))
            } else {
                None
            };
            if self.store.own_layer(id) != want {
                return Err(InvariantViolation::Layer(format!("{id:?}")));
            }
        }
        Ok(())
    }

    // -- Independence --

    fn settle(&mut self, summary: &mut RecomputeSummary) {
        let mut pending: Vec<ParticipantId> = core::mem::take(&mut self.pending)
            .into_iter()
            .filter(|&id| self.store.is_alive(id) && self.store.is_attached(id))
            .collect();
        pending.sort_by_key(|&id| (self.store.traversal_rank(id).unwrap_or(u32::MAX), id));

        for id in pending {
            self.store.set_marked(id.idx, false);
            summary.settled += 1;
            let independent = self.degree(id) > 0;
            if independent == self.store.is_independent(id) {
                continue;
            }
            if independent {
                self.make_independent(id);
                summary.became_independent += 1;
            } else {
                self.make_inherited(id);
                summary.became_inherited += 1;
            }
        }
    }

    /// Binds `id` into the graph inside its nearest independent ancestor and
    /// takes over the independent descendants that were bound to that
    /// ancestor through it.
    pub(crate) fn make_independent(&mut self, id: ParticipantId) {
        let ancestor = self.group_owner(id);
        let inner = self.inner_descendants(id);
        self.store.set_independent(id.idx, true);

        for &d in &inner {
            self.unbind(d, ancestor);
            self.bind(d, id.idx);
        }
        self.retain_edge(EdgeKey::extent(id), Origin::Embedding);
        self.bind(id, ancestor);
        self.store
            .set_own_layer(id.idx, self.graph.layer(ElementId::Participant(id)));
        self.touch_group(ancestor);
        self.touch_group(id.idx);
        tracing::trace!(?id, rebound = inner.len(), "participant became independent");
    }

    /// Inverse of [`make_independent`](Self::make_independent); also drops
    /// every tie-break naming `id`.
    pub(crate) fn make_inherited(&mut self, id: ParticipantId) {
        let ancestor = self.group_owner(id);
        let inner = self.inner_descendants(id);

        for &d in &inner {
            self.unbind(d, id.idx);
            self.bind(d, ancestor);
        }
        self.unbind(id, ancestor);
        self.release_edge(EdgeKey::extent(id));
        let named: Vec<_> = self
            .tie_breaks
            .keys()
            .copied()
            .filter(|&(a, b)| a == id || b == id)
            .collect();
        let mut scratch = RecomputeSummary::default();
        for key in named {
            self.drop_tie_break(key, &mut scratch);
        }

        self.store.set_independent(id.idx, false);
        self.store.set_own_layer(id.idx, None);
        self.touch_group(ancestor);
        self.touch_group(id.idx);
        tracing::trace!(?id, rebound = inner.len(), "participant became inherited");
    }

    fn inner_descendants(&self, id: ParticipantId) -> Vec<ParticipantId> {
        self.store
            .associations(id)
            .descendants()
            .filter_map(|d| self.store.id_at(d))
            .collect()
    }

    /// Embedding edges keeping `child` between the bottom and top of the
    /// independent participant in slot `owner`. Nothing for the root.
    fn embedding_edges(&self, child: ParticipantId, owner: u32) -> Option<[EdgeKey; 2]> {
        let owner = self.store.id_at(owner)?;
        Some([
            EdgeKey::embedding(ElementId::Participant(owner), ElementId::Participant(child)),
            EdgeKey::embedding(ElementId::Top(child), ElementId::Top(owner)),
        ])
    }

    fn bind(&mut self, child: ParticipantId, owner: u32) {
        for key in self.embedding_edges(child, owner).into_iter().flatten() {
            self.retain_edge(key, Origin::Embedding);
        }
    }

    fn unbind(&mut self, child: ParticipantId, owner: u32) {
        for key in self.embedding_edges(child, owner).into_iter().flatten() {
            self.release_edge(key);
        }
    }

    // -- Tie-breaks --

    fn sync_tie_breaks(&mut self, summary: &mut RecomputeSummary) {
        let groups = core::mem::take(&mut self.touched_groups);
        for owner in groups {
            let members = self.group_members(owner);
            let stale: Vec<_> = self
                .tie_breaks
                .iter()
                .filter(|(_, tie)| tie.group == owner)
                .filter(|((a, b), _)| !members.contains(a) || !members.contains(b))
                .map(|(&key, _)| key)
                .collect();
            for key in stale {
                self.drop_tie_break(key, summary);
            }

            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let key = if a < b { (a, b) } else { (b, a) };
                    if let Some(tie) = self.tie_breaks.get_mut(&key) {
                        // Both moved into this group together.
                        tie.group = owner;
                        continue;
                    }
                    let (lower, upper) = self.tie_break_direction(key.0, key.1);
                    let edge = EdgeKey {
                        below: ElementId::Top(lower),
                        above: ElementId::Participant(upper),
                        priority: Priority::TIE_BREAK,
                        embedded: false,
                    };
                    self.retain_edge(edge, Origin::TieBreak);
                    self.tie_breaks.insert(key, TieBreak { group: owner, edge });
                    summary.tie_breaks_added += 1;
                }
            }
        }
    }

    fn touch_all_groups(&mut self) {
        self.touched_groups.insert(INVALID);
        for idx in 0..self.store.capacity() {
            let independent = self
                .store
                .id_at(idx)
                .is_some_and(|id| self.store.is_attached(id) && self.store.is_independent(id));
            if independent {
                self.touched_groups.insert(idx);
            }
        }
    }

    fn drop_tie_break(&mut self, key: (ParticipantId, ParticipantId), summary: &mut RecomputeSummary) {
        if let Some(tie) = self.tie_breaks.remove(&key) {
            self.release_edge(tie.edge);
            summary.tie_breaks_removed += 1;
        }
    }

    /// Independent participants whose nearest independent ancestor is the
    /// participant in slot `owner`, or the root.
    fn group_members(&self, owner: u32) -> Vec<ParticipantId> {
        let live = is_root_group(owner)
            || self
                .store
                .id_at(owner)
                .is_some_and(|id| self.store.is_attached(id) && self.store.is_independent(id));
        if !live {
            return Vec::new();
        }
        self.store
            .associations_of(owner)
            .descendants()
            .filter_map(|d| self.store.id_at(d))
            .collect()
    }

    /// Returns `(lower, upper)`: the existing order if the graph has one,
    /// else the current values, else the default order.
    fn tie_break_direction(
        &self,
        a: ParticipantId,
        b: ParticipantId,
    ) -> (ParticipantId, ParticipantId) {
        let (ea, eb) = (ElementId::Participant(a), ElementId::Participant(b));
        if self.graph.has_path(ea, eb) {
            return (a, b);
        }
        if self.graph.has_path(eb, ea) {
            return (b, a);
        }
        let by_value = match (self.graph.layer(ea), self.graph.layer(eb)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        };
        let order = match by_value {
            Ordering::Equal => self.default_order.compare(&self.store, a, b),
            decided => decided,
        };
        if order == Ordering::Greater {
            (b, a)
        } else {
            (a, b)
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use super::*;
    use crate::graph::Relation;
    use crate::trace::ChangeObserver;
    use crate::translator::{
        Declaration, Members, MinimizePolicy, ReverseTreeOrder, TranslatorConfig,
    };

    fn attached(t: &mut Translator, parent: Option<ParticipantId>) -> ParticipantId {
        let id = t.create_participant();
        t.attach(id, parent);
        id
    }

    fn over_label(t: &mut Translator, id: ParticipantId, label: &str) {
        t.declare(
            id,
            label,
            Declaration::new(
                Members::participants([id]),
                Members::label(label),
                Priority::new(0),
            ),
        );
    }

    struct Summaries(Rc<RefCell<Vec<RecomputeSummary>>>);

    impl ChangeObserver<ElementId> for Summaries {
        fn on_recompute(&mut self, summary: &RecomputeSummary) {
            self.0.borrow_mut().push(*summary);
        }
    }

    #[test]
    fn unrelated_siblings_are_ordered_by_tree_order() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();

        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(a, b)]);
        assert!(t.layer(a) < t.layer(b));
    }

    #[test]
    fn reverse_default_order_flips_new_tie_breaks() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        t.set_default_order(Box::new(ReverseTreeOrder));
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();

        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(b, a)]);
        assert!(t.layer(b) < t.layer(a));
    }

    #[test]
    fn declared_order_overrides_tie_break_and_keeps_it_recorded() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();

        t.declare(
            a,
            "a-over-b",
            Declaration::new(
                Members::participants([a]),
                Members::participants([b]),
                Priority::MIN_USER,
            ),
        );
        let _ = t.recompute();
        assert!(t.layer(b) < t.layer(a));
        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(a, b)]);
        assert!(t.graph().is_suspended(ElementId::Top(a), ElementId::Participant(b)));

        // Withdrawing the declaration restores the incidental order.
        assert!(t.undeclare(a, "a-over-b"));
        let _ = t.recompute();
        assert!(t.layer(a) < t.layer(b));
    }

    #[test]
    fn disabled_tie_breaks_are_released() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().count(), 1);

        t.set_config(TranslatorConfig {
            tie_breaks: false,
            ..TranslatorConfig::checked()
        });
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().count(), 0);
        assert_eq!(t.layer(a), t.layer(b));
    }

    #[test]
    fn reenabled_tie_breaks_are_rebuilt() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();

        t.set_config(TranslatorConfig {
            tie_breaks: false,
            ..TranslatorConfig::checked()
        });
        let _ = t.recompute();
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().count(), 0);

        t.set_config(TranslatorConfig::checked());
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(a, b)]);
        assert!(t.layer(a) < t.layer(b));
    }

    #[test]
    fn independent_parent_adopts_independent_descendants() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let p = attached(&mut t, None);
        let mid = attached(&mut t, Some(p));
        let c = attached(&mut t, Some(mid));
        over_label(&mut t, c, "inner");
        let _ = t.recompute();
        assert!(t.participants().root_associations().contains(c.index()));

        over_label(&mut t, p, "outer");
        let _ = t.recompute();
        let store = t.participants();
        assert!(store.root_associations().contains(p.index()));
        assert!(!store.root_associations().contains(c.index()));
        assert_eq!(store.nearest_independent_ancestor(c), Some(p));
        let nested = Relation::new(
            ElementId::Participant(p),
            ElementId::Participant(c),
            Priority::EMBEDDING,
        )
        .with_embedded(true);
        assert!(t.graph().is_active(&nested));
        assert_eq!(t.layer(mid), t.layer(p));

        assert!(t.undeclare(p, "outer"));
        let _ = t.recompute();
        assert!(!t.graph().contains(&nested));
        assert!(t.participants().root_associations().contains(c.index()));
        assert_eq!(t.layer(mid), None);
        assert!(t.layer(c).is_some());
    }

    #[test]
    fn tie_breaks_move_with_their_group() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let p = attached(&mut t, None);
        let x = attached(&mut t, Some(p));
        let y = attached(&mut t, Some(p));
        over_label(&mut t, x, "x");
        over_label(&mut t, y, "y");
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(x, y)]);

        over_label(&mut t, p, "p");
        let _ = t.recompute();
        assert_eq!(t.tie_breaks().collect::<Vec<_>>(), [(x, y)]);
        let p_idx = p.index();
        assert!(t.tie_breaks.values().all(|tie| tie.group == p_idx));
    }

    #[test]
    fn observer_receives_one_summary_per_pass() {
        let mut t = Translator::with_config(TranslatorConfig::checked());
        let log = Rc::new(RefCell::new(Vec::new()));
        t.set_observer(Some(Box::new(Summaries(log.clone()))));
        let a = attached(&mut t, None);
        let b = attached(&mut t, None);
        over_label(&mut t, a, "first");
        over_label(&mut t, b, "second");
        let _ = t.recompute();
        let _ = t.recompute();

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].pass, 1);
        assert_eq!(log[0].settled, 2);
        assert_eq!(log[0].became_independent, 2);
        assert_eq!(log[0].tie_breaks_added, 1);
        assert!(log[0].minimized);
        assert_eq!(log[1].settled, 0);
        assert!(!log[1].minimized, "nothing changed");
        assert_eq!(log[1].layers_changed, 0);
    }

    #[test]
    fn minimize_compacts_drifted_layers() {
        let config = TranslatorConfig {
            minimize: MinimizePolicy::Never,
            ..TranslatorConfig::checked()
        };
        let mut t = Translator::with_config(config);
        let a = attached(&mut t, None);
        let decl = |low: &str| {
            Declaration::new(
                Members::participants([a]),
                Members::label(low),
                Priority::new(0),
            )
        };
        t.declare(a, "n", decl("base"));
        t.declare(a, "chain", Declaration::new(
            Members::label("base"),
            Members::label("floor"),
            Priority::new(0),
        ));
        let _ = t.recompute();
        assert_eq!(t.layer(a), Some(2));

        assert!(t.undeclare(a, "chain"));
        let _ = t.recompute();
        assert_eq!(t.layer(a), Some(2), "values never drop without compaction");

        t.set_config(TranslatorConfig::checked());
        t.declare(a, "n", decl("other"));
        let _ = t.recompute();
        assert_eq!(t.layer(a), Some(1));
    }

    #[test]
    fn broken_edge_bookkeeping_is_reported() {
        let mut t = Translator::new();
        let a = attached(&mut t, None);
        over_label(&mut t, a, "floor");
        let _ = t.recompute();
        assert_eq!(t.verify(), Ok(()));

        let self_edge = EdgeKey::extent(a);
        t.graph.remove_relation(&self_edge.relation(Origin::Embedding));
        assert!(matches!(
            t.verify(),
            Err(InvariantViolation::Reference(_))
        ));
    }
}
