// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer value propagation.
//!
//! Values are relaxed upward in level order: a bucket queue keyed by layer
//! value is seeded with the endpoints of a changed relation, and each popped
//! element raises the elements directly above it to the lowest value their
//! relations allow. Values never decrease here, so work is proportional to
//! the part of the graph that actually moves.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use super::relation::RelationSet;
use super::{ElementKey, OrderingGraph};

impl<K: ElementKey> OrderingGraph<K> {
    /// Raises layer values from `seeds` upward until every active relation
    /// is satisfied.
    pub(crate) fn relax(&mut self, seeds: &[K]) {
        let mut buckets: BTreeMap<i32, Vec<K>> = BTreeMap::new();
        for &seed in seeds {
            let Some(current) = self.layer(seed) else {
                continue;
            };
            let level = current.max(self.required_layer(seed));
            self.set_layer(seed, level);
            buckets.entry(level).or_default().push(seed);
        }

        let bound = self.vertices.len() * self.vertices.len() + seeds.len();
        let mut pops = 0_usize;
        while let Some((level, keys)) = buckets.pop_first() {
            for key in keys {
                if self.layer(key) != Some(level) {
                    // Raised again after it was queued.
                    continue;
                }
                pops += 1;
                debug_assert!(pops <= bound, "layer propagation did not converge");
                let Some(vertex) = self.vertices.get(&key) else {
                    continue;
                };
                let raised: Vec<(K, i32)> = vertex
                    .above
                    .iter()
                    .filter_map(|&up| {
                        let need = level + self.step((key, up));
                        (self.layer(up).unwrap_or(0) < need).then_some((up, need))
                    })
                    .collect();
                for (up, need) in raised {
                    self.set_layer(up, need);
                    buckets.entry(need).or_default().push(up);
                }
            }
        }
    }

    /// Recomputes every layer value from scratch as the longest path from the
    /// sources, compacting values that incremental propagation left high.
    ///
    /// Only elements whose value actually changes are reported by
    /// [`drain_changed`](Self::drain_changed).
    pub fn minimize(&mut self) {
        let mut pending: BTreeMap<K, usize> = self
            .vertices
            .iter()
            .map(|(&key, vertex)| (key, vertex.below.len()))
            .collect();
        let mut values: BTreeMap<K, i32> = BTreeMap::new();
        let mut queue: VecDeque<K> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&key, _)| key)
            .collect();

        while let Some(key) = queue.pop_front() {
            let Some(vertex) = self.vertices.get(&key) else {
                continue;
            };
            let value = vertex
                .below
                .iter()
                .map(|&down| values.get(&down).copied().unwrap_or(0) + self.step((down, key)))
                .max()
                .unwrap_or(0);
            values.insert(key, value);
            for &up in &vertex.above {
                if let Some(n) = pending.get_mut(&up) {
                    *n -= 1;
                    if *n == 0 {
                        queue.push_back(up);
                    }
                }
            }
        }

        debug_assert_eq!(values.len(), self.vertices.len(), "active relations form a cycle");
        for (key, value) in values {
            self.set_layer(key, value);
        }
        tracing::debug!(vertices = self.vertices.len(), max = ?self.max_layer(), "minimized layers");
    }

    /// Lowest value `key` may take given the elements directly below it.
    fn required_layer(&self, key: K) -> i32 {
        self.vertices.get(&key).map_or(0, |vertex| {
            vertex
                .below
                .iter()
                .map(|&down| self.layer(down).unwrap_or(0) + self.step((down, key)))
                .max()
                .unwrap_or(0)
        })
    }

    /// Minimum distance the active relation of `pair` requires: 0 when it
    /// is embedded, 1 otherwise.
    fn step(&self, pair: (K, K)) -> i32 {
        match self.sets.get(&pair).and_then(RelationSet::active) {
            Some(member) if member.embedded => 0,
            _ => 1,
        }
    }

    pub(crate) fn set_layer(&mut self, key: K, value: i32) {
        if self.layers.insert(key, value) != Some(value) {
            self.changed.insert(key);
        }
    }
}
