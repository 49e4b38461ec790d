// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshot of a translator.
//!
//! [`export`] writes a single JSON object with the graph (layers, relation
//! sets, suspended pairs and what blocks them), the containment tree, the
//! declarations, and the tie-breaks. Elements are rendered as strings:
//! `P3@0` for the bottom of a participant, `P3@0^` for its top, and
//! `label:name` for labels.

use std::io::{self, Write};

use serde_json::{Value, json};

use strata_core::stack::Status;
use strata_core::translator::{ElementId, Members, Translator};

/// Builds the snapshot as a JSON value.
#[must_use]
pub fn to_value(translator: &Translator) -> Value {
    let graph = translator.graph();
    let store = translator.participants();
    let name = |element: ElementId| element_name(translator, element);

    let layers: serde_json::Map<String, Value> = graph
        .layers()
        .map(|(element, layer)| (name(element), json!(layer)))
        .collect();

    let relations: Vec<Value> = graph
        .all_relations()
        .map(|(relation, active)| {
            json!({
                "below": name(relation.below),
                "above": name(relation.above),
                "priority": relation.priority.get(),
                "embedded": relation.embedded,
                "origin": format!("{:?}", relation.origin),
                "active": active,
            })
        })
        .collect();

    let suspended: Vec<Value> = graph
        .suspended()
        .map(|(below, above)| {
            let blocking: Vec<Value> = graph
                .blocking(below, above)
                .map(|(b, a)| json!([name(b), name(a)]))
                .collect();
            json!({
                "below": name(below),
                "above": name(above),
                "blocking": blocking,
            })
        })
        .collect();

    let participants: Vec<Value> = (0..store.capacity())
        .filter_map(|idx| store.id_at(idx))
        .map(|id| {
            let associations: Vec<Value> = store
                .associations(id)
                .iter()
                .map(|(descendant, path)| json!({ "descendant": descendant, "path": path }))
                .collect();
            json!({
                "index": id.index(),
                "generation": id.generation(),
                "parent": store.parent(id).map(|p| p.index()),
                "status": status_name(store.status(id)),
                "ref_count": store.ref_count(id),
                "own_layer": store.own_layer(id),
                "layer": store.layer(id),
                "associations": associations,
            })
        })
        .collect();

    let declarations: Vec<Value> = translator
        .declarations()
        .map(|(owner, decl_name, decl)| {
            json!({
                "owner": format!("{owner:?}"),
                "name": decl_name,
                "higher": members(&decl.higher),
                "lower": members(&decl.lower),
                "priority": decl.priority.get(),
            })
        })
        .collect();

    let tie_breaks: Vec<Value> = translator
        .tie_breaks()
        .map(|(lower, upper)| json!([format!("{lower:?}"), format!("{upper:?}")]))
        .collect();

    json!({
        "pass": translator.pass(),
        "layers": layers,
        "relations": relations,
        "suspended": suspended,
        "participants": participants,
        "declarations": declarations,
        "tie_breaks": tie_breaks,
    })
}

/// Writes the snapshot of `translator` as pretty-printed JSON.
pub fn export(translator: &Translator, writer: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &to_value(translator))?;
    writeln!(writer)
}

fn element_name(translator: &Translator, element: ElementId) -> String {
    match element {
        ElementId::Label(id) => match translator.label_name(id) {
            Some(label) => format!("label:{label}"),
            None => format!("{id:?}"),
        },
        other => format!("{other:?}"),
    }
}

fn members(side: &Members) -> Value {
    match side {
        Members::Participants(ids) => {
            Value::Array(ids.iter().map(|id| json!(format!("{id:?}"))).collect())
        }
        Members::Label(label) => json!(format!("label:{label}")),
    }
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::Unattached => "unattached",
        Status::Inherited => "inherited",
        Status::Independent => "independent",
        Status::MarkedDirty => "marked",
    }
}
