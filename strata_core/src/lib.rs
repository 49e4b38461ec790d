// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority-resolved stacking order for participants in a containment tree.
//!
//! `strata_core` turns pairwise, prioritized "X renders over Y" declarations
//! into integer layer values. Declarations change continuously; the engine
//! always produces values consistent with every declaration it can satisfy,
//! resolves cycles by setting aside the weakest offending declarations, and
//! re-admits them as soon as the conflict disappears. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   declare / undeclare / attach / detach
//!       │
//!       ▼
//!   Translator ──► OrderingGraph (relations, cycles, layers)
//!       │                 │
//!       │   recompute()   ▼
//!       └──────────► ParticipantStore::evaluate() ──► StackChanges
//! ```
//!
//! **[`graph`]**: generic directed graph of prioritized relations. Keeps the
//! active relations acyclic, suspends and retests conflicting ones, and
//! propagates layer values incrementally.
//!
//! **[`stack`]**: struct-of-arrays containment tree with generational
//! handles. Independent participants own a value; the others inherit the
//! value of their nearest independent ancestor.
//!
//! **[`translator`]**: named, set-valued declarations diffed into
//! reference-counted graph edges, plus the embedding and tie-break edges
//! that tie the graph to the tree.
//!
//! **[`dirty`]**: dirty-tracking channels used by the tree.
//!
//! **[`trace`]**: the [`ChangeObserver`](trace::ChangeObserver) hook and
//! per-pass [`RecomputeSummary`](trace::RecomputeSummary).
//!
//! **[`error`]**: [`InvariantViolation`](error::InvariantViolation), reported
//! by the `verify` passes.
//!
//! # Example
//!
//! ```
//! use strata_core::graph::Priority;
//! use strata_core::translator::{Declaration, Members, Translator};
//!
//! let mut translator = Translator::new();
//! let page = translator.create_participant();
//! let dialog = translator.create_participant();
//! translator.attach(page, None);
//! translator.attach(dialog, None);
//!
//! translator.declare(
//!     dialog,
//!     "modal",
//!     Declaration::new(
//!         Members::participants([dialog]),
//!         Members::participants([page]),
//!         Priority::new(10),
//!     ),
//! );
//! let changes = translator.recompute();
//!
//! assert!(translator.layer(page) < translator.layer(dialog));
//! assert_eq!(changes.added.len(), 2);
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod error;
pub mod graph;
pub mod stack;
pub mod trace;
pub mod translator;
