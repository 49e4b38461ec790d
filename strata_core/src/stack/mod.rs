// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Containment tree of stacking participants.
//!
//! A *participant* is a node of the application's containment hierarchy.
//! Each one has:
//!
//! - An identity ([`ParticipantId`]), a generational handle that goes stale
//!   when the participant is destroyed.
//! - Topology: parent, first-child, and sibling links, plus a reference
//!   count, since several owners may attach the same participant.
//! - A [`Status`]. An *independent* participant owns a layer value in the
//!   ordering graph; an *inherited* one copies the value of its nearest
//!   independent ancestor, or has none.
//! - An [`Associations`] map of its nearest independent descendants, which
//!   keep their own values when a value is copied down.
//!
//! Effective values are computed by [`evaluate`](ParticipantStore::evaluate)
//! from the dirty set maintained on the [`LAYER`](crate::dirty::LAYER)
//! channel. Storage is struct-of-arrays with index-based handles.

mod association;
mod evaluate;
mod id;
mod store;
mod traverse;

pub use association::Associations;
pub use evaluate::StackChanges;
pub use id::{INVALID, ParticipantId, Status};
pub use store::ParticipantStore;
pub use traverse::{Ancestors, Children};
