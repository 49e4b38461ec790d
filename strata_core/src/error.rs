// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Internal consistency failures reported by the verification passes.
//!
//! None of these can occur in a correct implementation. They are surfaced by
//! [`OrderingGraph::verify`](crate::graph::OrderingGraph::verify) and
//! [`Translator::verify`](crate::translator::Translator::verify) so tests and
//! tooling can check a state without panicking.

use alloc::string::String;

/// A broken structural invariant. Element keys are rendered with `Debug`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Active relations form a cycle.
    #[error("active relations form a cycle through {0}")]
    Cycle(String),
    /// A relation set has no members but is still stored.
    #[error("relation set {0} is empty but was not removed")]
    EmptySet(String),
    /// A relation set has more than one active member.
    #[error("relation set {pair} has {count} active members")]
    MultipleActive {
        /// The pair, rendered with `Debug`.
        pair: String,
        /// Number of active members found.
        count: usize,
    },
    /// A relation set is active and listed as suspended.
    #[error("relation set {0} is both active and suspended")]
    ActiveAndSuspended(String),
    /// A relation set has no active member but is not listed as suspended.
    #[error("relation set {0} has no active member but is not suspended")]
    NotSuspended(String),
    /// A weaker member is active although a stronger one is recorded.
    #[error("relation set {0} realizes a weaker member than its strongest")]
    WeakerActive(String),
    /// Vertex adjacency does not match the active relations.
    #[error("adjacency of {0} disagrees with the active relations")]
    Adjacency(String),
    /// A layer value violates an active relation, or is missing.
    #[error("layer values do not satisfy the active relation {0}")]
    Layer(String),
    /// An inherited participant does not carry its ancestor's value.
    #[error("participant {0} does not carry the layer it should inherit")]
    Inheritance(String),
    /// An association map does not list the nearest independent descendants.
    #[error("association map of {0} is out of date")]
    Association(String),
    /// The reference count of a generated or declared edge is inconsistent.
    #[error("edge {0} is referenced but not recorded in the graph")]
    Reference(String),
}
