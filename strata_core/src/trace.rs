// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observation hooks for relation changes and recompute passes.
//!
//! A [`ChangeObserver`] is installed on an
//! [`OrderingGraph`](crate::graph::OrderingGraph) with
//! [`set_observer`](crate::graph::OrderingGraph::set_observer). Every method
//! defaults to a no-op, so implementing only the events you care about is
//! fine. The graph calls [`on_relation_changed`](ChangeObserver::on_relation_changed)
//! whenever a relation becomes active or stops being active, which lets
//! external bookkeeping follow the realized edge set incrementally. The
//! [`Translator`](crate::translator::Translator) additionally reports one
//! [`RecomputeSummary`] per recompute pass.

use crate::graph::Relation;

/// Counters describing one
/// [`Translator::recompute`](crate::translator::Translator::recompute) pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecomputeSummary {
    /// Monotonic recompute counter.
    pub pass: u64,
    /// Participants whose independence was settled in this pass.
    pub settled: u32,
    /// Participants that became independent.
    pub became_independent: u32,
    /// Participants that stopped being independent.
    pub became_inherited: u32,
    /// Tie-break edges created.
    pub tie_breaks_added: u32,
    /// Tie-break edges released.
    pub tie_breaks_removed: u32,
    /// Whether the layer values were compacted.
    pub minimized: bool,
    /// Participants whose effective layer changed.
    pub layers_changed: u32,
    /// Relations currently suspended.
    pub suspended: u32,
}

/// Receives change notifications from the ordering engine.
///
/// All methods have default no-op implementations.
pub trait ChangeObserver<K> {
    /// Called when `relation` becomes the active relation of its pair
    /// (`active == true`) or is set aside (`active == false`).
    fn on_relation_changed(&mut self, relation: &Relation<K>, active: bool) {
        _ = (relation, active);
    }

    /// Called at the end of each recompute pass.
    fn on_recompute(&mut self, summary: &RecomputeSummary) {
        _ = summary;
    }
}

/// A [`ChangeObserver`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl<K> ChangeObserver<K> for NoopObserver {}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::graph::Priority;

    #[test]
    fn noop_observer_accepts_everything() {
        let mut observer = NoopObserver;
        ChangeObserver::<u32>::on_relation_changed(
            &mut observer,
            &Relation::new(1, 2, Priority::new(1)),
            true,
        );
        ChangeObserver::<u32>::on_recompute(&mut observer, &RecomputeSummary::default());
    }

    #[test]
    fn default_methods_can_be_overridden_selectively() {
        struct Counting {
            activations: Vec<(u32, u32)>,
        }
        impl ChangeObserver<u32> for Counting {
            fn on_relation_changed(&mut self, relation: &Relation<u32>, active: bool) {
                if active {
                    self.activations.push((relation.below, relation.above));
                }
            }
        }

        let mut observer = Counting {
            activations: Vec::new(),
        };
        observer.on_relation_changed(&Relation::new(1, 2, Priority::new(3)), true);
        observer.on_relation_changed(&Relation::new(2, 3, Priority::new(3)), false);
        observer.on_recompute(&RecomputeSummary::default());
        assert_eq!(observer.activations, [(1, 2)]);
    }
}
