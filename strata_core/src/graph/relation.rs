// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priorities, relations, and the per-pair relation sets that hold them.

use alloc::vec::Vec;
use core::fmt;

/// Strength of a [`Relation`].
///
/// Author-supplied values are clamped to [`MIN_USER`](Self::MIN_USER)
/// ..= [`MAX_USER`](Self::MAX_USER). The values outside that range are
/// reserved: [`EMBEDDING`](Self::EMBEDDING) and
/// [`TIE_BREAK`](Self::TIE_BREAK) are weaker than anything an author can
/// write, [`PIN`](Self::PIN) is stronger, and [`EXTENT`](Self::EXTENT) is
/// stronger than everything else.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    /// Strongest author priority.
    pub const MAX_USER: Self = Self(1_000_000_000);
    /// Weakest author priority.
    pub const MIN_USER: Self = Self(-1_000_000_000);
    /// Priority of generated containment edges.
    pub const EMBEDDING: Self = Self(-1_500_000_000);
    /// Priority of generated tie-break edges between siblings.
    pub const TIE_BREAK: Self = Self(-2_000_000_000);
    /// Pins a participant in front of everything an author can declare.
    pub const PIN: Self = Self(2_000_000_000);
    /// Priority of the edge from a participant's bottom to its own top.
    /// Nothing can outrank it, so such an edge is never displaced.
    pub const EXTENT: Self = Self(2_100_000_000);

    /// Creates an author priority, clamping into the author range.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        if value > Self::MAX_USER.0 {
            Self::MAX_USER
        } else if value < Self::MIN_USER.0 {
            Self::MIN_USER
        } else {
            Self(value)
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Returns whether the value lies outside the author range.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 > Self::MAX_USER.0 || self.0 < Self::MIN_USER.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(0)
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EMBEDDING => f.write_str("Priority(embedding)"),
            Self::TIE_BREAK => f.write_str("Priority(tie-break)"),
            Self::PIN => f.write_str("Priority(pin)"),
            Self::EXTENT => f.write_str("Priority(extent)"),
            Self(value) => write!(f, "Priority({value})"),
        }
    }
}

/// What produced a relation. Carried for diagnostics only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A named declaration.
    #[default]
    Declared,
    /// A containment rule keeping a participant inside its ancestor.
    Embedding,
    /// A generated edge preserving the incidental order of siblings.
    TieBreak,
}

/// A prioritized "`above` renders over `below`" declaration.
///
/// Within one `(below, above)` pair a relation is identified by its
/// `(priority, embedded)` combination; [`origin`](Self::origin) is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation<K> {
    /// The element rendered underneath.
    pub below: K,
    /// The element rendered on top.
    pub above: K,
    /// Strength used to resolve conflicts.
    pub priority: Priority,
    /// Allows `layer(above) == layer(below)`: `above` is nested in `below`.
    pub embedded: bool,
    /// Diagnostic metadata.
    pub origin: Origin,
}

impl<K> Relation<K> {
    /// Creates a strict, declared relation.
    #[must_use]
    pub const fn new(below: K, above: K, priority: Priority) -> Self {
        Self {
            below,
            above,
            priority,
            embedded: false,
            origin: Origin::Declared,
        }
    }

    /// Returns the relation with embedded equality enabled or disabled.
    #[must_use]
    pub const fn with_embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    /// Returns the relation with a different origin.
    #[must_use]
    pub const fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

/// Result of [`OrderingGraph::add_relation`](super::OrderingGraph::add_relation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddOutcome {
    /// The relation is now the active relation of its pair.
    Activated,
    /// The relation would close a cycle in which it is the weakest link; it
    /// is recorded and retried whenever the graph changes.
    Rejected,
    /// An active relation of the same pair is at least as strong; the new
    /// one is recorded but not realized.
    Shadowed,
    /// An identical relation was already recorded.
    AlreadyPresent,
    /// `below == above`; nothing was recorded.
    SelfLoop,
}

/// One recorded relation of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Member {
    pub(crate) priority: Priority,
    pub(crate) embedded: bool,
    pub(crate) origin: Origin,
    pub(crate) active: bool,
}

impl Member {
    pub(crate) fn relation<K>(self, (below, above): (K, K)) -> Relation<K> {
        Relation {
            below,
            above,
            priority: self.priority,
            embedded: self.embedded,
            origin: self.origin,
        }
    }
}

/// Every relation recorded for one ordered pair.
///
/// Members are kept sorted by priority, strongest first; equal priorities
/// keep insertion order. At most one member is active. While none is, the
/// pair is suspended and `blocking` lists the pairs whose active relations
/// formed the cycle that rejected it.
#[derive(Clone, Debug)]
pub(crate) struct RelationSet<K> {
    pub(crate) members: Vec<Member>,
    pub(crate) blocking: Vec<(K, K)>,
}

impl<K> Default for RelationSet<K> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            blocking: Vec::new(),
        }
    }
}

impl<K> RelationSet<K> {
    pub(crate) fn find(&self, priority: Priority, embedded: bool) -> Option<usize> {
        self.members
            .iter()
            .position(|m| m.priority == priority && m.embedded == embedded)
    }

    pub(crate) fn active_index(&self) -> Option<usize> {
        self.members.iter().position(|m| m.active)
    }

    pub(crate) fn active(&self) -> Option<Member> {
        self.members.iter().copied().find(|m| m.active)
    }

    pub(crate) fn strongest(&self) -> Option<Member> {
        self.members.first().copied()
    }

    /// Inserts after every member at least as strong and returns the index.
    pub(crate) fn insert(&mut self, member: Member) -> usize {
        let at = self
            .members
            .iter()
            .position(|m| m.priority < member.priority)
            .unwrap_or(self.members.len());
        self.members.insert(at, member);
        at
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
