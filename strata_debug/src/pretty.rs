// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable event output.
//!
//! [`PrettyPrintObserver`] implements [`ChangeObserver`] and writes one line
//! per event to a [`Write`](std::io::Write) destination (default: stderr).

use std::fmt;
use std::io::Write;

use strata_core::graph::{Origin, Relation};
use strata_core::trace::{ChangeObserver, RecomputeSummary};

/// Writes human-readable event lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintObserver<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> fmt::Debug for PrettyPrintObserver<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyPrintObserver").finish_non_exhaustive()
    }
}

impl PrettyPrintObserver {
    /// Creates an observer that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates an observer that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintObserver<W> {
    /// Creates an observer that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the observer and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn origin_name(origin: Origin) -> &'static str {
    match origin {
        Origin::Declared => "declared",
        Origin::Embedding => "embedding",
        Origin::TieBreak => "tie-break",
    }
}

impl<K: fmt::Debug, W: Write> ChangeObserver<K> for PrettyPrintObserver<W> {
    fn on_relation_changed(&mut self, relation: &Relation<K>, active: bool) {
        let tag = if active { "activate" } else { "suspend" };
        let rel = if relation.embedded { ">=" } else { ">" };
        let _ = writeln!(
            self.writer,
            "[{tag}] {:?} {rel} {:?} priority={} origin={}",
            relation.above,
            relation.below,
            relation.priority.get(),
            origin_name(relation.origin),
        );
    }

    fn on_recompute(&mut self, s: &RecomputeSummary) {
        let _ = writeln!(
            self.writer,
            "[recompute] pass={} settled={} +independent={} +inherited={} \
             tie-breaks=+{}/-{} minimized={} layers={} suspended={}",
            s.pass,
            s.settled,
            s.became_independent,
            s.became_inherited,
            s.tie_breaks_added,
            s.tie_breaks_removed,
            s.minimized,
            s.layers_changed,
            s.suspended,
        );
    }
}

#[cfg(test)]
mod tests {
    use strata_core::graph::{OrderingGraph, Priority};

    use super::*;

    #[test]
    fn pretty_print_relation_events() {
        let mut observer = PrettyPrintObserver::with_writer(Vec::<u8>::new());
        observer.on_relation_changed(&Relation::new('a', 'b', Priority::new(3)), true);
        observer.on_relation_changed(
            &Relation::new('b', 'c', Priority::EMBEDDING)
                .with_embedded(true)
                .with_origin(Origin::Embedding),
            false,
        );
        let output = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "[activate] 'b' > 'a' priority=3 origin=declared");
        assert!(lines[1].starts_with("[suspend] 'c' >= 'b'"), "got: {output}");
        assert!(lines[1].ends_with("origin=embedding"), "got: {output}");
    }

    #[test]
    fn pretty_print_summary() {
        let mut observer = PrettyPrintObserver::with_writer(Vec::<u8>::new());
        ChangeObserver::<u32>::on_recompute(
            &mut observer,
            &RecomputeSummary {
                pass: 4,
                tie_breaks_added: 2,
                ..RecomputeSummary::default()
            },
        );
        let output = String::from_utf8(observer.into_inner()).unwrap();
        assert!(output.contains("[recompute] pass=4"), "got: {output}");
        assert!(output.contains("tie-breaks=+2/-0"), "got: {output}");
    }

    #[test]
    fn installed_on_a_graph_it_sees_cycle_resolution() {
        let mut graph = OrderingGraph::new();
        let (writer, buffer) = SharedBuffer::new();
        graph.set_observer(Some(Box::new(PrettyPrintObserver::with_writer(writer))));
        graph.add_relation(Relation::new('a', 'b', Priority::new(1)));
        graph.add_relation(Relation::new('b', 'a', Priority::new(5)));

        let output = String::from_utf8(buffer.borrow().clone()).unwrap();
        assert_eq!(output.lines().filter(|l| l.starts_with("[activate]")).count(), 2);
        assert_eq!(output.lines().filter(|l| l.starts_with("[suspend]")).count(), 1);
    }

    /// A writer whose bytes stay readable after it is boxed away.
    struct SharedBuffer(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn new() -> (Self, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
            let bytes = std::rc::Rc::default();
            (Self(std::rc::Rc::clone(&bytes)), bytes)
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
