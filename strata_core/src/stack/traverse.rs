// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, ParticipantId};
use super::store::ParticipantStore;

/// An iterator over the direct children of a participant.
///
/// Created by [`ParticipantStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a ParticipantStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a ParticipantStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = ParticipantId;

    fn next(&mut self) -> Option<ParticipantId> {
        let idx = self.current;
        let id = self.store.id_of(idx)?;
        self.current = self.store.next_sibling[idx as usize];
        Some(id)
    }
}

/// An iterator over the proper ancestors of a participant, nearest first.
///
/// Created by [`ParticipantStore::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    store: &'a ParticipantStore,
    current: u32,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(store: &'a ParticipantStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = ParticipantId;

    fn next(&mut self) -> Option<ParticipantId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.parent[idx as usize];
        self.store.id_of(idx)
    }
}
