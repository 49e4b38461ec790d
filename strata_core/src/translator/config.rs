// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translator configuration.

/// When [`Translator::recompute`](super::Translator::recompute) compacts
/// layer values with [`OrderingGraph::minimize`](crate::graph::OrderingGraph::minimize).
///
/// Incremental propagation only ever raises values, so long-running sessions
/// drift upward. Compaction rewrites every value and therefore reports more
/// participants as changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MinimizePolicy {
    /// Never compact.
    #[default]
    Never,
    /// Compact at the end of every pass that changed the graph.
    EveryRecompute,
    /// Compact when the highest layer value exceeds the bound.
    AboveLayer(i32),
}

impl MinimizePolicy {
    /// Returns whether a graph whose highest value is `max_layer` should be
    /// compacted.
    #[must_use]
    pub const fn should_minimize(self, max_layer: Option<i32>) -> bool {
        match (self, max_layer) {
            (Self::Never, _) | (_, None) => false,
            (Self::EveryRecompute, Some(_)) => true,
            (Self::AboveLayer(bound), Some(max)) => max > bound,
        }
    }
}

/// Configuration for the [`Translator`](super::Translator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TranslatorConfig {
    /// Compaction policy for layer values.
    pub minimize: MinimizePolicy,
    /// Whether to synthesize tie-break edges that keep the incidental order
    /// of independent siblings stable.
    pub tie_breaks: bool,
    /// Whether to run the consistency check after every recompute, panicking
    /// on failure.
    pub verify: bool,
}

impl TranslatorConfig {
    /// Default configuration: no compaction, tie-breaks on, no checking.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            minimize: MinimizePolicy::Never,
            tie_breaks: true,
            verify: false,
        }
    }

    /// Configuration for tests and debugging: checks every pass and compacts
    /// every pass so values stay small and readable.
    #[must_use]
    pub const fn checked() -> Self {
        Self {
            minimize: MinimizePolicy::EveryRecompute,
            tie_breaks: true,
            verify: true,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimize_policy_thresholds() {
        assert!(!MinimizePolicy::Never.should_minimize(Some(100)));
        assert!(MinimizePolicy::EveryRecompute.should_minimize(Some(0)));
        assert!(!MinimizePolicy::EveryRecompute.should_minimize(None));
        assert!(!MinimizePolicy::AboveLayer(8).should_minimize(Some(8)));
        assert!(MinimizePolicy::AboveLayer(8).should_minimize(Some(9)));
    }

    #[test]
    fn default_config_synthesizes_tie_breaks() {
        let config = TranslatorConfig::default();
        assert_eq!(config.minimize, MinimizePolicy::Never);
        assert!(config.tie_breaks);
        assert!(!config.verify);
    }
}
