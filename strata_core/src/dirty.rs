// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The containment tree uses [`understory_dirty`] to find the participants
//! whose effective layer value has to be recomputed.
//!
//! - [`LAYER`] has a dependency edge from every child to its parent and is
//!   marked with [`EagerPolicy`](understory_dirty::EagerPolicy): a new own
//!   value, a change of independence, or a change of parent marks the whole
//!   subtree, because inherited values flow downward.
//! - [`TOPOLOGY`] is marked when participants are attached or detached. It
//!   only signals that the traversal order was rebuilt.
//!
//! Both channels are drained by
//! [`ParticipantStore::evaluate`](crate::stack::ParticipantStore::evaluate),
//! which reports the results as [`StackChanges`](crate::stack::StackChanges).

use understory_dirty::Channel;

/// Own value or value source changed; descendants must be recomputed.
pub const LAYER: Channel = Channel::new(0);

/// Tree shape changed.
pub const TOPOLOGY: Channel = Channel::new(1);
