// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constraint translator: named declarations in, layer values out.
//!
//! The [`Translator`] owns an [`OrderingGraph`] keyed by [`ElementId`] and a
//! [`ParticipantStore`], and keeps them in step:
//!
//! - [`declare`](Translator::declare) diffs a named [`Declaration`] against
//!   its previous version and retains or releases the graph edges of the
//!   pairs that changed. Edges are reference counted, so a relation leaves
//!   the graph exactly when nothing needs it any more.
//! - A participant named by at least one declaration is *independent*: its
//!   bottom and top elements are bound into the graph with embedding edges
//!   that keep it inside its nearest independent ancestor. The edge from
//!   its bottom to its own top carries [`Priority::EXTENT`], so in a
//!   conflict between declarations the weaker declaration is set aside.
//! - Independent participants sharing the same nearest independent ancestor
//!   get weak tie-break edges, so their incidental order stays stable when
//!   unrelated declarations change.
//! - [`recompute`](Translator::recompute) settles independence, feeds graph
//!   layers into the tree and evaluates it.
//!
//! ```text
//!   declare / undeclare ──► edges (ref-counted) ──► OrderingGraph
//!           │                                            │
//!           ▼                                            ▼
//!   marked participants ──► recompute() ──► own layers ──► ParticipantStore::evaluate()
//!                                                              │
//!                                                              ▼
//!                                                         StackChanges
//! ```

mod config;
mod declaration;
mod element;
mod order;
mod recompute;

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

pub use config::{MinimizePolicy, TranslatorConfig};
pub use declaration::{Declaration, Members};
pub use element::{ElementId, LabelId};
pub use order::{DefaultOrder, ReverseTreeOrder, TreeOrder};

use element::Labels;

use crate::graph::{OrderingGraph, Origin, Priority, Relation};
use crate::stack::{INVALID, ParticipantId, ParticipantStore};
use crate::trace::ChangeObserver;

/// Identity of a generated or declared graph edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EdgeKey {
    pub(crate) below: ElementId,
    pub(crate) above: ElementId,
    pub(crate) priority: Priority,
    pub(crate) embedded: bool,
}

impl EdgeKey {
    fn relation(self, origin: Origin) -> Relation<ElementId> {
        Relation::new(self.below, self.above, self.priority)
            .with_embedded(self.embedded)
            .with_origin(origin)
    }

    /// An embedding edge: `above` stays within or on top of `below`.
    fn embedding(below: ElementId, above: ElementId) -> Self {
        Self {
            below,
            above,
            priority: Priority::EMBEDDING,
            embedded: true,
        }
    }

    /// The edge from the bottom of `id` to its own top. Declarations
    /// contradicting it yield instead of it.
    fn extent(id: ParticipantId) -> Self {
        Self {
            below: ElementId::Participant(id),
            above: ElementId::Top(id),
            priority: Priority::EXTENT,
            embedded: true,
        }
    }
}

/// A tie-break edge between two independent siblings.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TieBreak {
    /// Slot of the sibling group's owner, [`INVALID`] for the root.
    pub(crate) group: u32,
    pub(crate) edge: EdgeKey,
}

/// Translates named declarations on a containment tree into layer values.
///
/// See the [module documentation](self) for the data flow.
pub struct Translator {
    pub(crate) graph: OrderingGraph<ElementId>,
    pub(crate) store: ParticipantStore,
    pub(crate) labels: Labels,
    pub(crate) declarations: BTreeMap<(ParticipantId, String), Declaration>,
    /// Declarations naming a participant as a member, keyed by member.
    pub(crate) member_of: BTreeMap<ParticipantId, BTreeSet<(ParticipantId, String)>>,
    pub(crate) edges: BTreeMap<EdgeKey, u32>,
    /// Declared pairs involving each participant.
    pub(crate) degree: BTreeMap<ParticipantId, u32>,
    /// Participants whose independence must be settled.
    pub(crate) pending: BTreeSet<ParticipantId>,
    /// Keyed by the unordered participant pair, smaller handle first.
    pub(crate) tie_breaks: BTreeMap<(ParticipantId, ParticipantId), TieBreak>,
    /// Sibling groups to resynchronize, by owner slot ([`INVALID`] = root).
    pub(crate) touched_groups: BTreeSet<u32>,
    pub(crate) default_order: Box<dyn DefaultOrder>,
    pub(crate) config: TranslatorConfig,
    pub(crate) pass: u64,
    pub(crate) needs_recompute: bool,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("graph", &self.graph)
            .field("declarations", &self.declarations.len())
            .field("edges", &self.edges.len())
            .field("tie_breaks", &self.tie_breaks.len())
            .field("default_order", &self.default_order)
            .field("config", &self.config)
            .field("pass", &self.pass)
            .field("needs_recompute", &self.needs_recompute)
            .finish_non_exhaustive()
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// Creates an empty translator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TranslatorConfig::new())
    }

    /// Creates an empty translator.
    #[must_use]
    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            graph: OrderingGraph::new(),
            store: ParticipantStore::new(),
            labels: Labels::default(),
            declarations: BTreeMap::new(),
            member_of: BTreeMap::new(),
            edges: BTreeMap::new(),
            degree: BTreeMap::new(),
            pending: BTreeSet::new(),
            tie_breaks: BTreeMap::new(),
            touched_groups: BTreeSet::new(),
            default_order: Box::new(TreeOrder),
            config,
            pass: 0,
            needs_recompute: false,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Replaces the configuration. Takes effect at the next recompute.
    pub fn set_config(&mut self, config: TranslatorConfig) {
        self.config = config;
    }

    /// Replaces the order consulted for siblings without any known relative
    /// order. Existing tie-breaks keep their direction.
    pub fn set_default_order(&mut self, order: Box<dyn DefaultOrder>) {
        self.default_order = order;
    }

    /// Installs an observer on the ordering graph, returning the previous
    /// one. It also receives one summary per recompute.
    pub fn set_observer(
        &mut self,
        observer: Option<Box<dyn ChangeObserver<ElementId>>>,
    ) -> Option<Box<dyn ChangeObserver<ElementId>>> {
        self.graph.set_observer(observer)
    }

    // -- Participants --

    /// Creates an unattached participant.
    pub fn create_participant(&mut self) -> ParticipantId {
        self.store.create()
    }

    /// Attaches `id` under `parent` (or the root) and returns the new
    /// reference count.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, `parent` is unattached, or `id` is
    /// already attached under another parent.
    pub fn attach(&mut self, id: ParticipantId, parent: Option<ParticipantId>) -> u32 {
        let count = self.store.attach(id, parent);
        self.needs_recompute = true;
        count
    }

    /// Drops one reference to `id` and returns the remaining count.
    ///
    /// When the last reference goes, every declaration owned by the
    /// participant is withdrawn, it is removed from every declaration naming
    /// it, its embedding and tie-break edges are released, and its slot is
    /// freed. The handle is stale afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the participant is not attached, or
    /// the last reference goes while it still has children.
    pub fn detach(&mut self, id: ParticipantId) -> u32 {
        assert!(
            self.store.is_attached(id),
            "participant {id:?} is not attached"
        );
        self.needs_recompute = true;
        if self.store.ref_count(id) > 1 {
            return self.store.detach(id);
        }
        assert!(
            self.store.children(id).next().is_none(),
            "cannot destroy participant with children"
        );

        let owned: Vec<String> = self
            .declarations
            .keys()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, name)| name.clone())
            .collect();
        for name in owned {
            self.undeclare(id, &name);
        }
        let naming = self.member_of.remove(&id).unwrap_or_default();
        for (owner, name) in naming {
            if let Some(old) = self.declarations.get(&(owner, name.clone())) {
                let stripped = old.without(id);
                self.declare(owner, &name, stripped);
            }
        }

        if self.store.is_independent(id) {
            self.make_inherited(id);
        }
        self.pending.remove(&id);
        self.degree.remove(&id);
        self.store.set_marked(id.idx, false);
        let remaining = self.store.detach(id);
        self.store.destroy(id);
        tracing::trace!(?id, "participant destroyed");
        remaining
    }

    // -- Queries --

    /// Returns the effective layer value of a participant as of the last
    /// [`recompute`](Self::recompute).
    #[must_use]
    pub fn layer(&self, id: ParticipantId) -> Option<i32> {
        self.store.layer(id)
    }

    /// Returns the current graph value of any element.
    #[must_use]
    pub fn element_layer(&self, element: ElementId) -> Option<i32> {
        self.graph.layer(element)
    }

    /// Returns whether `above` is currently ordered over `below`.
    #[must_use]
    pub fn has_path(&self, below: ElementId, above: ElementId) -> bool {
        self.graph.has_path(below, above)
    }

    /// Returns the active relation between two elements, if any.
    #[must_use]
    pub fn active_relation(&self, below: ElementId, above: ElementId) -> Option<Relation<ElementId>> {
        self.graph.active_relation(below, above)
    }

    /// Returns the ordering graph.
    #[must_use]
    pub fn graph(&self) -> &OrderingGraph<ElementId> {
        &self.graph
    }

    /// Returns the containment tree.
    #[must_use]
    pub fn participants(&self) -> &ParticipantStore {
        &self.store
    }

    /// Returns the id of a label, if a live declaration names it.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<LabelId> {
        self.labels.get(name)
    }

    /// Returns the name of a label.
    #[must_use]
    pub fn label_name(&self, id: LabelId) -> Option<&str> {
        self.labels.name(id)
    }

    /// Returns the declaration `name` on `owner`.
    #[must_use]
    pub fn declaration(&self, owner: ParticipantId, name: &str) -> Option<&Declaration> {
        self.declarations.get(&(owner, String::from(name)))
    }

    /// Returns every `(owner, name, declaration)` in key order.
    pub fn declarations(&self) -> impl Iterator<Item = (ParticipantId, &str, &Declaration)> + '_ {
        self.declarations
            .iter()
            .map(|((owner, name), decl)| (*owner, name.as_str(), decl))
    }

    /// Returns the number of declared pairs naming `id`.
    #[must_use]
    pub fn degree(&self, id: ParticipantId) -> u32 {
        self.degree.get(&id).copied().unwrap_or(0)
    }

    /// Returns the tie-break edges in pair order as `(lower, upper)`.
    pub fn tie_breaks(&self) -> impl Iterator<Item = (ParticipantId, ParticipantId)> + '_ {
        self.tie_breaks.values().filter_map(|tie| {
            match (tie.edge.below, tie.edge.above) {
                (ElementId::Top(lower), ElementId::Participant(upper)) => Some((lower, upper)),
                _ => None,
            }
        })
    }

    /// Returns whether something changed since the last recompute.
    #[must_use]
    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    /// Returns the number of completed recompute passes.
    #[must_use]
    pub fn pass(&self) -> u64 {
        self.pass
    }

    // -- Edge bookkeeping --

    /// Takes one reference to `key`, adding its relation on the first.
    pub(crate) fn retain_edge(&mut self, key: EdgeKey, origin: Origin) {
        let count = self.edges.entry(key).or_insert(0);
        *count += 1;
        if *count == 1 {
            let _ = self.graph.add_relation(key.relation(origin));
            self.needs_recompute = true;
        }
    }

    /// Drops one reference to `key`, removing its relation on the last.
    pub(crate) fn release_edge(&mut self, key: EdgeKey) {
        let Some(count) = self.edges.get_mut(&key) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.edges.remove(&key);
            self.graph.remove_relation(&key.relation(Origin::Declared));
            self.needs_recompute = true;
        }
    }

    /// Adjusts the declared-pair count of `id` and marks it when the count
    /// crosses zero.
    pub(crate) fn adjust_degree(&mut self, id: ParticipantId, delta: i32) {
        let count = self.degree.entry(id).or_insert(0);
        let before = *count;
        *count = count.saturating_add_signed(delta);
        let after = *count;
        if after == 0 {
            self.degree.remove(&id);
        }
        if (before == 0) != (after == 0) {
            self.pending.insert(id);
            self.store.set_marked(id.idx, true);
        }
    }

    /// Slot of the sibling group an independent `id` belongs to.
    pub(crate) fn group_owner(&self, id: ParticipantId) -> u32 {
        self.store.nearest_independent_above(id.idx)
    }

    pub(crate) fn touch_group(&mut self, owner: u32) {
        self.touched_groups.insert(owner);
    }
}

/// Returns whether the group owner is the implicit root.
pub(crate) const fn is_root_group(owner: u32) -> bool {
    owner == INVALID
}
