// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and JSON snapshots for strata diagnostics.
//!
//! This crate provides [`ChangeObserver`](strata_core::trace::ChangeObserver)
//! implementations and export helpers for development and post-mortem
//! analysis:
//!
//! - [`pretty::PrettyPrintObserver`]: human-readable one-line-per-event
//!   output.
//! - [`recorder::RecorderObserver`]: in-memory event log, read back through
//!   a shared [`recorder::Recording`] handle.
//! - [`snapshot::export`]: writes the full state of a
//!   [`Translator`](strata_core::translator::Translator) as JSON.

pub mod pretty;
pub mod recorder;
pub mod snapshot;
