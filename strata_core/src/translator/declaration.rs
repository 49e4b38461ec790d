// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named declarations and their incremental diff.
//!
//! A declaration `higher over lower` stands for every pair `(l, h)` of its
//! two sides, realized as the strict relation `top(l) -> bottom(h)`. When a
//! declaration is replaced, only pairs outside `kept_lower × kept_higher`
//! are released and retained, so unchanged pairs never leave the graph.

use alloc::string::String;
use alloc::vec::Vec;

use super::element::ElementId;
use super::{EdgeKey, Translator};
use crate::graph::{Origin, Priority};
use crate::stack::ParticipantId;

/// One side of a [`Declaration`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Members {
    /// A set of participants. Duplicates are ignored.
    Participants(Vec<ParticipantId>),
    /// A named label, shared by every declaration using the same name.
    Label(String),
}

impl Members {
    /// Creates a participant side, sorted and deduplicated.
    pub fn participants(ids: impl IntoIterator<Item = ParticipantId>) -> Self {
        let mut ids: Vec<ParticipantId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self::Participants(ids)
    }

    /// Creates a label side.
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }

    /// Returns the participants of this side; empty for a label.
    #[must_use]
    pub fn ids(&self) -> &[ParticipantId] {
        match self {
            Self::Participants(ids) => ids,
            Self::Label(_) => &[],
        }
    }

    fn normalized(self) -> Self {
        match self {
            Self::Participants(ids) => Self::participants(ids),
            label @ Self::Label(_) => label,
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Participants(_), Self::Participants(_)) | (Self::Label(_), Self::Label(_))
        )
    }
}

/// "Every member of `higher` renders over every member of `lower`."
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Declaration {
    /// The side rendered on top.
    pub higher: Members,
    /// The side rendered underneath.
    pub lower: Members,
    /// Strength of every resulting relation.
    pub priority: Priority,
}

impl Declaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(higher: Members, lower: Members, priority: Priority) -> Self {
        Self {
            higher,
            lower,
            priority,
        }
    }

    fn normalized(self) -> Self {
        Self {
            higher: self.higher.normalized(),
            lower: self.lower.normalized(),
            priority: self.priority,
        }
    }

    /// Returns the declaration with `id` removed from both sides.
    pub(crate) fn without(&self, id: ParticipantId) -> Self {
        let strip = |side: &Members| match side {
            Members::Participants(ids) => {
                Members::Participants(ids.iter().copied().filter(|&m| m != id).collect())
            }
            label @ Members::Label(_) => label.clone(),
        };
        Self {
            higher: strip(&self.higher),
            lower: strip(&self.lower),
            priority: self.priority,
        }
    }

    fn names(&self, id: ParticipantId) -> bool {
        self.higher.ids().contains(&id) || self.lower.ids().contains(&id)
    }
}

/// A resolved member: participants have distinct bottom and top elements, a
/// label is both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Term {
    Participant(ParticipantId),
    Label(ElementId),
}

impl Term {
    fn bottom(self) -> ElementId {
        match self {
            Self::Participant(id) => ElementId::Participant(id),
            Self::Label(element) => element,
        }
    }

    fn top(self) -> ElementId {
        match self {
            Self::Participant(id) => ElementId::Top(id),
            Self::Label(element) => element,
        }
    }

    fn participant(self) -> Option<ParticipantId> {
        match self {
            Self::Participant(id) => Some(id),
            Self::Label(_) => None,
        }
    }
}

impl Translator {
    /// Declares, or replaces, the declaration `name` owned by `owner`.
    ///
    /// Only the pairs that differ from the previous version with the same
    /// name are released or retained. A change of priority, or of a side
    /// between participants and a label, replaces every pair. Participants
    /// that gain their first or lose their last declared pair are marked for
    /// the next [`recompute`](Self::recompute).
    ///
    /// # Panics
    ///
    /// Panics if `owner` or a named participant is stale or unattached.
    pub fn declare(&mut self, owner: ParticipantId, name: &str, declaration: Declaration) {
        assert!(
            self.store.is_attached(owner),
            "cannot declare on unattached participant {owner:?}"
        );
        let declaration = declaration.normalized();
        for &id in declaration.higher.ids().iter().chain(declaration.lower.ids()) {
            assert!(
                self.store.is_attached(id),
                "cannot declare relation on unattached participant {id:?}"
            );
        }

        let key = (owner, String::from(name));
        let previous = self.declarations.remove(&key);
        if previous.as_ref() == Some(&declaration) {
            self.declarations.insert(key, declaration);
            return;
        }

        self.acquire_labels(&declaration);
        let new_lower = self.resolve(&declaration.lower);
        let new_higher = self.resolve(&declaration.higher);
        let (old_lower, old_higher, kept_lower, kept_higher) = match &previous {
            Some(old) => {
                let old_lower = self.resolve(&old.lower);
                let old_higher = self.resolve(&old.higher);
                let comparable = old.priority == declaration.priority
                    && old.lower.same_kind(&declaration.lower)
                    && old.higher.same_kind(&declaration.higher);
                let (kept_lower, kept_higher) = if comparable {
                    (
                        intersection(&old_lower, &new_lower),
                        intersection(&old_higher, &new_higher),
                    )
                } else {
                    (Vec::new(), Vec::new())
                };
                (old_lower, old_higher, kept_lower, kept_higher)
            }
            None => (Vec::new(), Vec::new(), Vec::new(), Vec::new()),
        };

        if let Some(old) = &previous {
            let mut released = 0_u32;
            for &l in &old_lower {
                for &h in &old_higher {
                    if kept_lower.contains(&l) && kept_higher.contains(&h) {
                        continue;
                    }
                    if self.release_pair(l, h, old.priority) {
                        released += 1;
                    }
                }
            }
            self.unindex(owner, name, old, &declaration);
            self.release_labels(old);
            tracing::trace!(?owner, name, released, "released declared pairs");
        }

        let mut retained = 0_u32;
        for &l in &new_lower {
            for &h in &new_higher {
                if kept_lower.contains(&l) && kept_higher.contains(&h) {
                    continue;
                }
                if self.retain_pair(l, h, declaration.priority) {
                    retained += 1;
                }
            }
        }
        for &id in declaration.higher.ids().iter().chain(declaration.lower.ids()) {
            self.member_of
                .entry(id)
                .or_default()
                .insert((owner, String::from(name)));
        }
        tracing::trace!(?owner, name, retained, "retained declared pairs");

        self.declarations.insert(key, declaration);
        self.needs_recompute = true;
    }

    /// Withdraws the declaration `name` owned by `owner`, releasing every
    /// pair. Returns `false` if there was none.
    pub fn undeclare(&mut self, owner: ParticipantId, name: &str) -> bool {
        let Some(old) = self.declarations.remove(&(owner, String::from(name))) else {
            return false;
        };
        let lower = self.resolve(&old.lower);
        let higher = self.resolve(&old.higher);
        for &l in &lower {
            for &h in &higher {
                self.release_pair(l, h, old.priority);
            }
        }
        let empty = Declaration::new(
            Members::Participants(Vec::new()),
            Members::Participants(Vec::new()),
            old.priority,
        );
        self.unindex(owner, name, &old, &empty);
        self.release_labels(&old);
        self.needs_recompute = true;
        true
    }

    /// Resolves a side whose label, if any, is held by a live declaration.
    fn resolve(&self, side: &Members) -> Vec<Term> {
        match side {
            Members::Participants(ids) => ids.iter().copied().map(Term::Participant).collect(),
            Members::Label(name) => self
                .labels
                .get(name)
                .map(|id| Term::Label(ElementId::Label(id)))
                .into_iter()
                .collect(),
        }
    }

    fn acquire_labels(&mut self, declaration: &Declaration) {
        for side in [&declaration.lower, &declaration.higher] {
            if let Members::Label(name) = side {
                self.labels.acquire(name);
            }
        }
    }

    fn release_labels(&mut self, declaration: &Declaration) {
        for side in [&declaration.lower, &declaration.higher] {
            if let Members::Label(name) = side {
                if self.labels.release(name) {
                    tracing::trace!(label = name.as_str(), "label forgotten");
                }
            }
        }
    }

    /// Drops the membership index entries of participants `old` names and
    /// `new` does not.
    fn unindex(&mut self, owner: ParticipantId, name: &str, old: &Declaration, new: &Declaration) {
        for &id in old.higher.ids().iter().chain(old.lower.ids()) {
            if new.names(id) {
                continue;
            }
            if let Some(keys) = self.member_of.get_mut(&id) {
                keys.remove(&(owner, String::from(name)));
                if keys.is_empty() {
                    self.member_of.remove(&id);
                }
            }
        }
    }

    fn retain_pair(&mut self, lower: Term, higher: Term, priority: Priority) -> bool {
        if lower == higher {
            return false;
        }
        self.retain_edge(pair_edge(lower, higher, priority), Origin::Declared);
        for id in [lower.participant(), higher.participant()].into_iter().flatten() {
            self.adjust_degree(id, 1);
        }
        true
    }

    fn release_pair(&mut self, lower: Term, higher: Term, priority: Priority) -> bool {
        if lower == higher {
            return false;
        }
        self.release_edge(pair_edge(lower, higher, priority));
        for id in [lower.participant(), higher.participant()].into_iter().flatten() {
            self.adjust_degree(id, -1);
        }
        true
    }
}

fn pair_edge(lower: Term, higher: Term, priority: Priority) -> EdgeKey {
    EdgeKey {
        below: lower.top(),
        above: higher.bottom(),
        priority,
        embedded: false,
    }
}

fn intersection(a: &[Term], b: &[Term]) -> Vec<Term> {
    a.iter().copied().filter(|t| b.contains(t)).collect()
}
