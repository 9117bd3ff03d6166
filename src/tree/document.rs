//! JSON tree documents produced by an external parser
//!
//! ```json
//! {
//!   "kind": { "type": "program", "name": "sim" },
//!   "text": "program sim", "file": "src/sim.f90",
//!   "start_line": 1, "end_line": 40,
//!   "children": [ ... ]
//! }
//! ```

use super::node::{Annotation, NodeId, NodeKind, NodeRef, StructuralNode, StructuralTree};
use crate::source_location::SourceLocation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One node of a serialized tree, children nested in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub kind: NodeKind,
    #[serde(default)]
    pub text: String,
    pub file: PathBuf,
    pub start_line: u32,
    /// Closing line; defaults to `start_line`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDocument>,
}

impl NodeDocument {
    fn to_node(&self) -> StructuralNode {
        let end_line = self.end_line.unwrap_or(self.start_line);
        let mut node = StructuralNode::new(
            self.kind.clone(),
            self.text.clone(),
            SourceLocation::line(self.file.clone(), self.start_line),
            SourceLocation::line(self.file.clone(), end_line),
        );
        if let Some(vars) = &self.variables {
            node = node.with_variables(vars.iter().cloned());
        }
        if let Some(note) = &self.annotation {
            node = node.with_annotation(Annotation::new(note.clone()));
        }
        node
    }

    fn from_node(node: NodeRef<'_>) -> Self {
        let raw = node.node();
        Self {
            kind: raw.kind().clone(),
            text: raw.text().to_string(),
            file: raw.start().file.clone(),
            start_line: raw.start().start_line,
            end_line: Some(raw.end().end_line),
            variables: raw.variables().map(|v| v.iter().cloned().collect()),
            annotation: raw.annotation().map(|a| a.content.clone()),
            children: node.children().map(NodeDocument::from_node).collect(),
        }
    }
}

impl StructuralTree {
    /// Build a tree from a parsed document
    pub fn from_document(doc: &NodeDocument) -> super::Result<Self> {
        let mut tree = StructuralTree::new(doc.to_node())?;
        let root = tree.root();
        attach_all(&mut tree, root, &doc.children)?;
        Ok(tree)
    }

    pub fn to_document(&self) -> NodeDocument {
        NodeDocument::from_node(self.root_ref())
    }

    /// Load a JSON tree document from disk
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tree document: {}", path.display()))?;
        let doc: NodeDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tree document: {}", path.display()))?;
        let tree = StructuralTree::from_document(&doc)
            .with_context(|| format!("Invalid tree document: {}", path.display()))?;
        tracing::debug!("Loaded tree with {} nodes from {}", tree.len(), path.display());
        Ok(tree)
    }
}

fn attach_all(tree: &mut StructuralTree, parent: NodeId, children: &[NodeDocument]) -> super::Result<()> {
    for child in children {
        let id = tree.attach_child(parent, child.to_node())?;
        attach_all(tree, id, &child.children)?;
    }
    Ok(())
}
