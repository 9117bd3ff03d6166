//! Attaching merged costs to structural tree nodes
//!
//! Tree documents usually carry project-relative paths while reconciled
//! costs carry the scanned project path. A cost lands in the tree file equal
//! to its path, or failing that in the longest relative tree file its path
//! ends with component-wise.

use crate::aggregate::{AggregatedCost, Category};
use crate::source_location::SourceLocation;
use crate::tree::{Annotation, NodeId, StructuralTree};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A merged cost placed on a tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCost {
    pub node: NodeId,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    pub namespace: String,
    pub category: Category,
    pub symbol: String,
    pub samples: f64,
    pub ratio: f64,
}

fn tree_files(tree: &StructuralTree) -> BTreeSet<PathBuf> {
    tree.iter()
        .map(|n| n.node().start().file.clone())
        .collect()
}

/// The single tree file a cost path belongs to
fn best_file<'a>(cost_file: &Path, files: &'a BTreeSet<PathBuf>) -> Option<&'a PathBuf> {
    if let Some(exact) = files.get(cost_file) {
        return Some(exact);
    }
    files
        .iter()
        .filter(|f| f.is_relative() && cost_file.ends_with(f))
        .max_by_key(|f| f.components().count())
}

/// Deepest nodes for every resolved cost; unresolved costs are skipped
pub fn attach_costs<'a>(
    tree: &StructuralTree,
    costs: impl IntoIterator<Item = &'a AggregatedCost>,
) -> Vec<NodeCost> {
    let files = tree_files(tree);
    let mut attached = Vec::new();

    for cost in costs {
        let Some(location) = cost.location.resolved() else {
            continue;
        };
        let Some(file) = best_file(location.file(), &files) else {
            continue;
        };
        let query = SourceLocation::new(file.clone(), location.start_line, location.end_line);
        for node_id in tree.search_code_line(tree.root(), &query) {
            let Some(node) = tree.node(node_id) else {
                continue;
            };
            attached.push(NodeCost {
                node: node_id,
                node_id: node.id(),
                layout_id: node.layout_id(),
                namespace: tree.namespace(node_id),
                category: cost.category,
                symbol: cost.symbol.clone(),
                samples: cost.samples,
                ratio: cost.ratio,
            });
        }
    }

    tracing::debug!("Attached {} costs to tree nodes", attached.len());
    attached
}

/// Annotate each node with the costs attached to it, replacing any previous
/// annotation; returns the annotated nodes in tree order
pub fn annotate(tree: &mut StructuralTree, attached: &[NodeCost]) -> Vec<NodeId> {
    let mut per_node: BTreeMap<NodeId, Vec<String>> = BTreeMap::new();
    for cost in attached {
        let text = format!(
            "{} {:.2}% {} ({})",
            cost.category,
            cost.ratio * 100.0,
            cost.samples,
            cost.symbol
        );
        per_node.entry(cost.node).or_default().push(text);
    }

    for (id, lines) in &per_node {
        if let Err(e) = tree.set_annotation(*id, Annotation::new(lines.join("; "))) {
            tracing::warn!("Skipping annotation: {}", e);
        }
    }
    tree.annotated_nodes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::CostLocation;
    use crate::tree::{NodeKind, StructuralNode};

    fn tree() -> (StructuralTree, NodeId, NodeId) {
        let file = "src/sim.f90";
        let mut tree = StructuralTree::new(StructuralNode::new(
            NodeKind::Procedure {
                name: "compute".to_string(),
            },
            "subroutine compute",
            SourceLocation::line(file, 1),
            SourceLocation::line(file, 30),
        ))
        .unwrap();
        let root = tree.root();
        let body = tree
            .attach_child(
                root,
                StructuralNode::new(
                    NodeKind::Repetition,
                    "do i=1,n",
                    SourceLocation::line(file, 5),
                    SourceLocation::line(file, 10),
                ),
            )
            .unwrap();
        let stmt = tree
            .attach_child(
                body,
                StructuralNode::single_line(
                    NodeKind::Statement,
                    "a(i) = 0",
                    SourceLocation::line(file, 6),
                ),
            )
            .unwrap();
        (tree, body, stmt)
    }

    fn cost(location: CostLocation, samples: f64, ratio: f64) -> AggregatedCost {
        AggregatedCost {
            category: Category::Line,
            location,
            symbol: "compute_".to_string(),
            samples,
            ratio,
            nest: None,
            loop_kind: None,
            parallel_kind: None,
        }
    }

    #[test]
    fn test_resolved_cost_lands_on_deepest_node() {
        let (tree, _, stmt) = tree();
        let costs = [cost(
            CostLocation::Resolved(SourceLocation::line("/home/me/proj/src/sim.f90", 6)),
            12.0,
            0.5,
        )];
        let attached = attach_costs(&tree, &costs);
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].node, stmt);
        assert_eq!(attached[0].namespace, "compute");
        assert!(attached[0].node_id.ends_with("$0:a(i) = 0"));
    }

    #[test]
    fn test_cost_lands_only_in_longest_matching_file() {
        let mut tree = StructuralTree::new(StructuralNode::new(
            NodeKind::Program {
                name: "sim".to_string(),
            },
            "program sim",
            SourceLocation::line("sim.f90", 1),
            SourceLocation::line("sim.f90", 40),
        ))
        .unwrap();
        let root = tree.root();
        let top_level = tree
            .attach_child(
                root,
                StructuralNode::single_line(
                    NodeKind::Statement,
                    "x = 1",
                    SourceLocation::line("sim.f90", 6),
                ),
            )
            .unwrap();
        let nested = tree
            .attach_child(
                root,
                StructuralNode::new(
                    NodeKind::Procedure {
                        name: "kernel".to_string(),
                    },
                    "subroutine kernel",
                    SourceLocation::line("src/sim.f90", 1),
                    SourceLocation::line("src/sim.f90", 30),
                ),
            )
            .unwrap();
        let stmt = tree
            .attach_child(
                nested,
                StructuralNode::single_line(
                    NodeKind::Statement,
                    "y = 2",
                    SourceLocation::line("src/sim.f90", 6),
                ),
            )
            .unwrap();

        let deep = [cost(
            CostLocation::Resolved(SourceLocation::line("/p/src/sim.f90", 6)),
            4.0,
            0.5,
        )];
        let nodes: Vec<NodeId> = attach_costs(&tree, &deep).iter().map(|c| c.node).collect();
        assert_eq!(nodes, vec![stmt]);

        let shallow = [cost(
            CostLocation::Resolved(SourceLocation::line("/p/lib/sim.f90", 6)),
            4.0,
            0.5,
        )];
        let nodes: Vec<NodeId> = attach_costs(&tree, &shallow).iter().map(|c| c.node).collect();
        assert_eq!(nodes, vec![top_level]);
    }

    #[test]
    fn test_unresolved_and_foreign_files_are_skipped() {
        let (tree, _, _) = tree();
        let costs = [
            cost(
                CostLocation::Unresolved {
                    file: Some("sim.f90".to_string()),
                    start_line: 6,
                    end_line: 6,
                },
                1.0,
                0.5,
            ),
            cost(
                CostLocation::Resolved(SourceLocation::line("/proj/lib/other.f90", 6)),
                1.0,
                0.5,
            ),
        ];
        assert!(attach_costs(&tree, &costs).is_empty());
    }

    #[test]
    fn test_annotate_marks_nodes() {
        let (mut tree, body, _) = tree();
        let costs = [cost(
            CostLocation::Resolved(SourceLocation::line("/p/src/sim.f90", 9)),
            3.0,
            0.25,
        )];
        let attached = attach_costs(&tree, &costs);
        let annotated = annotate(&mut tree, &attached);
        assert_eq!(annotated, vec![body]);
        let note = tree.get(body).unwrap().annotation().unwrap();
        assert_eq!(note.content, "line 25.00% 3 (compute_)");
    }

    #[test]
    fn test_annotate_joins_costs_per_node() {
        let (mut tree, body, stmt) = tree();
        let costs = [
            cost(
                CostLocation::Resolved(SourceLocation::line("/p/src/sim.f90", 6)),
                6.0,
                0.5,
            ),
            cost(
                CostLocation::Resolved(SourceLocation::line("/p/src/sim.f90", 9)),
                3.0,
                0.25,
            ),
            cost(
                CostLocation::Resolved(SourceLocation::line("/p/src/sim.f90", 6)),
                3.0,
                0.25,
            ),
        ];
        let attached = attach_costs(&tree, &costs);
        let annotated = annotate(&mut tree, &attached);
        assert_eq!(annotated, vec![body, stmt]);
        let note = tree.get(stmt).unwrap().annotation().unwrap();
        assert_eq!(
            note.content,
            "line 50.00% 6 (compute_); line 25.00% 3 (compute_)"
        );
    }
}
