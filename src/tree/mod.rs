//! Structural model of the analyzed source program
//!
//! The tree is built once per analysis pass by an external parser (either
//! through [`StructuralTree::attach_child`] or from a JSON tree document) and
//! is read-mostly afterwards. Nodes live in an arena and are addressed by
//! [`NodeId`]; each node keeps a parent index for upward queries.
//!
//! Two identities are offered:
//! - the node ID (`parent$index:text`), valid only while sibling order and
//!   statement text are unchanged, and
//! - the layout ID, which only counts loop/conditional ("shape") siblings and
//!   therefore survives re-parses that add or remove plain statements.

mod document;
mod equality;
mod identity;
mod node;
mod search;
mod variable;

pub use document::NodeDocument;
pub use node::{
    Annotation, NodeId, NodeKind, NodeRef, ProcedureCall, SelectionKind, StructuralNode,
    StructuralTree,
};
pub use search::MeasurementArea;
pub use variable::{DimensionBound, VariableDeclaration};

use thiserror::Error;

/// Separator between path segments of node and layout IDs
pub const ID_SEPARATOR: char = '$';

/// Errors raised by tree mutation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    #[error("Node span is reversed: starts at line {start} but ends at line {end}")]
    InvalidSpan { start: u32, end: u32 },
}

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Case-insensitive comparison used by every textual tree match
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
