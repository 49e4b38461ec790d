// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! A [`RecorderObserver`] is handed to the graph or translator, which owns
//! it from then on. The [`Recording`] returned alongside it shares the same
//! buffer, so events stay readable from the outside.

use std::cell::RefCell;
use std::rc::Rc;

use strata_core::graph::Relation;
use strata_core::trace::{ChangeObserver, RecomputeSummary};

/// One recorded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent<K> {
    /// A relation became active (`active == true`) or was set aside.
    Relation {
        /// The relation.
        relation: Relation<K>,
        /// Whether it became active.
        active: bool,
    },
    /// A recompute pass finished.
    Recompute(RecomputeSummary),
}

/// A [`ChangeObserver`] that appends every event to a shared buffer.
#[derive(Debug)]
pub struct RecorderObserver<K> {
    events: Rc<RefCell<Vec<RecordedEvent<K>>>>,
}

impl<K> RecorderObserver<K> {
    /// Creates a recorder and the handle that reads it.
    #[must_use]
    pub fn new() -> (Self, Recording<K>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                events: Rc::clone(&events),
            },
            Recording { events },
        )
    }
}

impl<K: Copy> ChangeObserver<K> for RecorderObserver<K> {
    fn on_relation_changed(&mut self, relation: &Relation<K>, active: bool) {
        self.events.borrow_mut().push(RecordedEvent::Relation {
            relation: *relation,
            active,
        });
    }

    fn on_recompute(&mut self, summary: &RecomputeSummary) {
        self.events
            .borrow_mut()
            .push(RecordedEvent::Recompute(*summary));
    }
}

/// Read handle for the events of a [`RecorderObserver`].
#[derive(Debug)]
pub struct Recording<K> {
    events: Rc<RefCell<Vec<RecordedEvent<K>>>>,
}

impl<K> Clone for Recording<K> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<K: Copy> Recording<K> {
    /// Returns a copy of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent<K>> {
        self.events.borrow().clone()
    }

    /// Removes and returns every event recorded so far.
    pub fn take(&self) -> Vec<RecordedEvent<K>> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Returns the relations that changed state, in order.
    #[must_use]
    pub fn relation_changes(&self) -> Vec<(Relation<K>, bool)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                RecordedEvent::Relation { relation, active } => Some((relation, active)),
                RecordedEvent::Recompute(_) => None,
            })
            .collect()
    }

    /// Returns the recompute summaries, in order.
    #[must_use]
    pub fn summaries(&self) -> Vec<RecomputeSummary> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Recompute(summary) => Some(*summary),
                RecordedEvent::Relation { .. } => None,
            })
            .collect()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use strata_core::graph::{OrderingGraph, Priority};
    use strata_core::translator::{Declaration, ElementId, Members, Translator};

    use super::*;

    fn rel(below: char, above: char, priority: i32) -> Relation<char> {
        Relation::new(below, above, Priority::new(priority))
    }

    #[test]
    fn records_displacement_and_restoration() {
        let mut graph = OrderingGraph::new();
        let (observer, recording) = RecorderObserver::new();
        graph.set_observer(Some(Box::new(observer)));

        graph.add_relation(rel('a', 'b', 10));
        graph.add_relation(rel('b', 'c', 10));
        graph.add_relation(rel('c', 'a', 5));
        assert_eq!(recording.len(), 2, "the weakest relation is never activated");

        graph.remove_relation(&rel('a', 'b', 10));
        let changes = recording.relation_changes();
        assert_eq!(changes[2], (rel('a', 'b', 10), false));
        assert_eq!(changes[3], (rel('c', 'a', 5), true));
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn take_drains_the_buffer() {
        let mut graph = OrderingGraph::new();
        let (observer, recording) = RecorderObserver::new();
        graph.set_observer(Some(Box::new(observer)));
        graph.add_relation(rel('a', 'b', 1));

        let reader = recording.clone();
        assert_eq!(reader.take().len(), 1);
        assert!(recording.is_empty());
    }

    #[test]
    fn records_translator_summaries() {
        let mut translator = Translator::new();
        let (observer, recording) = RecorderObserver::<ElementId>::new();
        translator.set_observer(Some(Box::new(observer)));

        let a = translator.create_participant();
        let b = translator.create_participant();
        translator.attach(a, None);
        translator.attach(b, None);
        translator.declare(
            a,
            "n",
            Declaration::new(
                Members::participants([b]),
                Members::participants([a]),
                Priority::new(1),
            ),
        );
        let _ = translator.recompute();

        let summaries = recording.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].became_independent, 2);
        assert!(
            recording
                .relation_changes()
                .iter()
                .any(|(r, active)| *active && r.above == ElementId::Participant(b))
        );
        assert!(matches!(
            recording.events().last(),
            Some(RecordedEvent::Recompute(_))
        ));
    }
}
