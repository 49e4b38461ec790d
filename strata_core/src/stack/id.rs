// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Participant identity.

use core::fmt;

/// Sentinel value meaning "no participant" in index fields, including the
/// parent link of participants attached directly under the implicit root.
pub const INVALID: u32 = u32::MAX;

/// A handle to a participant in a [`ParticipantStore`](super::ParticipantStore).
///
/// Holds a slot index and a generation counter, so a handle kept after its
/// participant was destroyed is detected even when the slot is reused.
/// Handles order by slot index, then generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ParticipantId {
    /// Returns the raw slot index, as used by
    /// [`StackChanges`](super::StackChanges) and the `*_at` accessors.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}@{}", self.idx, self.generation)
    }
}

/// How a participant obtains its layer value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not attached to the containment tree; has no value.
    #[default]
    Unattached,
    /// Copies the value of its nearest independent ancestor, if any.
    Inherited,
    /// Owns a value in the ordering graph.
    Independent,
    /// Its declarations changed since the last recompute.
    MarkedDirty,
}
