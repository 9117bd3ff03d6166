//! Range, variable, call and annotation queries

use super::eq_ignore_case;
use super::node::{NodeId, NodeKind, NodeRef, ProcedureCall, StructuralTree};
use crate::source_location::SourceLocation;
use serde::Serialize;
use std::collections::BTreeSet;

/// Start/stop call sites bracketing one event-counter measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeasurementArea {
    pub start: NodeId,
    /// `None` when no stop call pairs with `start`, or for the whole program
    pub stop: Option<NodeId>,
}

impl StructuralTree {
    /// Deepest nodes under `from` whose range overlaps `query`
    ///
    /// A node is returned only when none of its descendants overlap.
    pub fn search_code_line(&self, from: NodeId, query: &SourceLocation) -> Vec<NodeId> {
        let mut found = Vec::new();
        if let Some(node) = self.node(from) {
            collect_overlapping(node, query, &mut found);
        }
        found
    }

    /// Union of the variables referenced anywhere in the subtree
    ///
    /// `None` means no node in the subtree carries variable information.
    pub fn all_variables(&self, id: NodeId) -> Option<BTreeSet<String>> {
        let node = self.node(id)?;
        let mut acc: Option<BTreeSet<String>> = node.node().variables().cloned();
        for child in node.children() {
            if let Some(vars) = self.all_variables(child.node_id()) {
                acc.get_or_insert_with(BTreeSet::new).extend(vars);
            }
        }
        acc
    }

    /// Call sites under `id`, in source order
    pub fn calls(&self, id: NodeId) -> Vec<&ProcedureCall> {
        let mut calls = Vec::new();
        if let Some(node) = self.node(id) {
            collect_calls(node, &mut calls);
        }
        calls
    }

    /// Dotted names of the enclosing modules and procedures, outermost first
    pub fn namespace(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            match node.kind() {
                NodeKind::Module { name } | NodeKind::Procedure { name } => {
                    names.push(name.as_str())
                }
                _ => {}
            }
            current = node.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// Nodes carrying an annotation, pre-order
    pub fn annotated_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|n| n.node().annotation().is_some())
            .map(|n| n.node_id())
            .collect()
    }

    /// First procedure whose name matches, ignoring case
    pub fn find_procedure(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|n| matches!(n.kind(), NodeKind::Procedure { name: p } if eq_ignore_case(p, name)))
            .map(|n| n.node_id())
    }

    /// Event-counter areas for `group`
    ///
    /// Each `start_fn` call naming the group opens an area; each `stop_fn`
    /// call naming it closes the first area still open. The group `all`
    /// selects the main program unit when it is present in the tree.
    pub fn measurement_areas(&self, group: &str, start_fn: &str, stop_fn: &str) -> Vec<MeasurementArea> {
        if eq_ignore_case(group, "all") {
            let main = self.root_ref().kind().unit_name().and_then(|name| self.find_procedure(name));
            if let Some(main) = main {
                return vec![MeasurementArea {
                    start: main,
                    stop: None,
                }];
            }
        }

        let mut areas: Vec<MeasurementArea> = Vec::new();
        for site in self.usages_naming(start_fn, group) {
            areas.push(MeasurementArea {
                start: site,
                stop: None,
            });
        }
        for site in self.usages_naming(stop_fn, group) {
            if let Some(open) = areas.iter_mut().find(|a| a.stop.is_none()) {
                open.stop = Some(site);
            }
        }
        areas
    }

    fn usages_naming(&self, callee: &str, group: &str) -> Vec<NodeId> {
        self.iter()
            .filter(|n| match n.kind() {
                NodeKind::ProcedureUsage(call) => {
                    eq_ignore_case(&call.callee, callee)
                        && call
                            .arguments
                            .iter()
                            .any(|arg| eq_ignore_case(trim_quotes(arg), group))
                }
                _ => false,
            })
            .map(|n| n.node_id())
            .collect()
    }
}

fn trim_quotes(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '"' || c == '\'')
}

fn collect_overlapping(node: NodeRef<'_>, query: &SourceLocation, found: &mut Vec<NodeId>) {
    let before = found.len();
    for child in node.children() {
        collect_overlapping(child, query, found);
    }
    if found.len() == before && node.node().range().overlaps(query) {
        found.push(node.node_id());
    }
}

fn collect_calls<'a>(node: NodeRef<'a>, calls: &mut Vec<&'a ProcedureCall>) {
    for child in node.children() {
        match child.kind() {
            NodeKind::ProcedureUsage(call) => calls.push(call),
            NodeKind::Selection { .. } => {
                for condition in child.children() {
                    collect_calls(condition, calls);
                }
            }
            NodeKind::Substitution { calls: embedded } => calls.extend(embedded.iter()),
            NodeKind::Program { .. }
            | NodeKind::Module { .. }
            | NodeKind::Procedure { .. }
            | NodeKind::Repetition
            | NodeKind::Condition
            | NodeKind::Statement
            | NodeKind::VariableDeclaration(_) => collect_calls(child, calls),
        }
    }
}
