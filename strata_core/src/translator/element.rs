// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordering-graph keys and label interning.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;

use crate::stack::ParticipantId;

/// Identifier of a named label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub(crate) u32);

impl LabelId {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A key of the ordering graph.
///
/// Every independent participant is represented by two elements: its
/// bottom ([`Participant`](Self::Participant)), which carries its layer
/// value, and its [`Top`](Self::Top), which bounds everything nested inside
/// it. A label is a single element used as both.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    /// The bottom of a participant.
    Participant(ParticipantId),
    /// The top marker of a participant.
    Top(ParticipantId),
    /// A named label.
    Label(LabelId),
}

impl ElementId {
    /// Returns the participant this element belongs to, if any.
    #[must_use]
    pub const fn participant(self) -> Option<ParticipantId> {
        match self {
            Self::Participant(id) | Self::Top(id) => Some(id),
            Self::Label(_) => None,
        }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant(id) => write!(f, "{id:?}"),
            Self::Top(id) => write!(f, "{id:?}^"),
            Self::Label(id) => write!(f, "{id:?}"),
        }
    }
}

/// Interns label names.
///
/// Every declaration side naming a label holds one reference to it. A label
/// is forgotten once its last reference is released, and its id is never
/// handed out again.
#[derive(Clone, Debug, Default)]
pub(crate) struct Labels {
    ids: BTreeMap<String, LabelId>,
    names: BTreeMap<LabelId, (String, u32)>,
    next: u32,
}

impl Labels {
    /// Takes a reference to `name`, interning it if needed.
    pub(crate) fn acquire(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.ids.get(name) {
            if let Some((_, count)) = self.names.get_mut(&id) {
                *count += 1;
            }
            return id;
        }
        let id = LabelId(self.next);
        self.next = self.next.saturating_add(1);
        self.ids.insert(String::from(name), id);
        self.names.insert(id, (String::from(name), 1));
        id
    }

    /// Drops a reference to `name`. Returns `true` if it was the last one.
    pub(crate) fn release(&mut self, name: &str) -> bool {
        let Some(&id) = self.ids.get(name) else {
            return false;
        };
        let Some((_, count)) = self.names.get_mut(&id) else {
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return false;
        }
        self.names.remove(&id);
        self.ids.remove(name);
        true
    }

    pub(crate) fn get(&self, name: &str) -> Option<LabelId> {
        self.ids.get(name).copied()
    }

    pub(crate) fn name(&self, id: LabelId) -> Option<&str> {
        self.names.get(&id).map(|(name, _)| name.as_str())
    }
}
