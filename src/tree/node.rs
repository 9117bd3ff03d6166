//! Arena storage for structural nodes

use super::variable::VariableDeclaration;
use super::{Result, TreeError};
use crate::source_location::SourceLocation;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Index of a node inside its owning [`StructuralTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Conditional construct flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    If,
    Select,
    Where,
}

impl SelectionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            SelectionKind::If => "if",
            SelectionKind::Select => "select",
            SelectionKind::Where => "where",
        }
    }
}

/// A procedure call site: callee plus argument expressions as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureCall {
    pub callee: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl ProcedureCall {
    pub fn new(callee: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            callee: callee.into(),
            arguments,
        }
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Whole-program root; `name` is the main program unit
    Program { name: String },
    Module { name: String },
    Procedure { name: String },
    Repetition,
    Selection { form: SelectionKind },
    Condition,
    /// Assignment; `calls` are the calls embedded in the right-hand side
    Substitution {
        #[serde(default)]
        calls: Vec<ProcedureCall>,
    },
    ProcedureUsage(ProcedureCall),
    Statement,
    VariableDeclaration(VariableDeclaration),
}

impl NodeKind {
    /// Repetition and Selection are the shape kinds
    pub fn is_shape(&self) -> bool {
        matches!(self, NodeKind::Repetition | NodeKind::Selection { .. })
    }

    /// Per-node segment of the layout ID; `None` for declarations
    pub fn layout_keyword(&self) -> Option<&'static str> {
        match self {
            NodeKind::Program { .. } => Some("program"),
            NodeKind::Module { .. } => Some("module"),
            NodeKind::Procedure { .. } => Some("procedure"),
            NodeKind::Repetition => Some("do"),
            NodeKind::Selection { form } => Some(form.keyword()),
            NodeKind::Condition => Some("condition"),
            NodeKind::Substitution { .. } => Some("substitution"),
            NodeKind::ProcedureUsage(_) => Some("procedureusage"),
            NodeKind::Statement => Some("statement"),
            NodeKind::VariableDeclaration(_) => None,
        }
    }

    /// Name carried by program units
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            NodeKind::Program { name }
            | NodeKind::Module { name }
            | NodeKind::Procedure { name } => Some(name),
            _ => None,
        }
    }
}

/// Opaque payload attached to a node by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub content: String,
}

impl Annotation {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// A node as stored in the arena
#[derive(Debug, Clone)]
pub struct StructuralNode {
    kind: NodeKind,
    text: String,
    start: SourceLocation,
    end: SourceLocation,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    variables: Option<BTreeSet<String>>,
    annotation: Option<Annotation>,
}

impl StructuralNode {
    /// Detached node; `start` is the opening statement, `end` the closing one
    pub fn new(
        kind: NodeKind,
        text: impl Into<String>,
        start: SourceLocation,
        end: SourceLocation,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
            parent: None,
            children: Vec::new(),
            variables: None,
            annotation: None,
        }
    }

    /// Node whose statement occupies a single line
    pub fn single_line(kind: NodeKind, text: impl Into<String>, location: SourceLocation) -> Self {
        let end = location.clone();
        Self::new(kind, text, location, end)
    }

    /// Variables referenced by this node's own statement
    pub fn with_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Statement text as supplied by the parser
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text used for identity and structural equality
    pub fn canonical_text(&self) -> Cow<'_, str> {
        match &self.kind {
            NodeKind::VariableDeclaration(decl) => Cow::Owned(decl.canonical_text()),
            _ => Cow::Borrowed(&self.text),
        }
    }

    pub fn start(&self) -> &SourceLocation {
        &self.start
    }

    pub fn end(&self) -> &SourceLocation {
        &self.end
    }

    /// Full range from the opening to the closing statement
    pub fn range(&self) -> SourceLocation {
        self.start.spanning(&self.end)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn variables(&self) -> Option<&BTreeSet<String>> {
        self.variables.as_ref()
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    fn check_span(&self) -> Result<()> {
        if self.start.start_line > self.end.end_line {
            return Err(TreeError::InvalidSpan {
                start: self.start.start_line,
                end: self.end.end_line,
            });
        }
        Ok(())
    }
}

/// Arena-backed structural tree
#[derive(Debug, Clone)]
pub struct StructuralTree {
    nodes: Vec<StructuralNode>,
    root: NodeId,
}

impl StructuralTree {
    /// Create a tree holding only `root`
    pub fn new(mut root: StructuralNode) -> Result<Self> {
        root.check_span()?;
        root.parent = None;
        root.children.clear();
        Ok(Self {
            nodes: vec![root],
            root: NodeId(0),
        })
    }

    /// Append `node` as the last child of `parent`
    pub fn attach_child(&mut self, parent: NodeId, mut node: StructuralNode) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(TreeError::UnknownNode(parent));
        }
        node.check_span()?;

        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&StructuralNode> {
        self.nodes.get(id.0)
    }

    /// Borrowed handle for navigation and comparison
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|_| NodeRef { tree: self, id })
    }

    pub fn root_ref(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root,
        }
    }

    /// Replace the annotation of `id`, returning the previous one
    pub fn set_annotation(&mut self, id: NodeId, annotation: Annotation) -> Result<Option<Annotation>> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(TreeError::UnknownNode(id))?;
        Ok(node.annotation.replace(annotation))
    }

    /// Drop the annotation of `id` and of every descendant
    pub fn clear_annotations(&mut self, id: NodeId) -> Result<()> {
        if id.0 >= self.nodes.len() {
            return Err(TreeError::UnknownNode(id));
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            node.annotation = None;
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }

    /// Pre-order walk starting at `from` (inclusive)
    pub fn descendants(&self, from: NodeId) -> Descendants<'_> {
        let stack = if from.0 < self.nodes.len() {
            vec![from]
        } else {
            Vec::new()
        };
        Descendants { tree: self, stack }
    }

    /// Pre-order walk over the whole tree
    pub fn iter(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    pub(crate) fn raw(&self, id: NodeId) -> &StructuralNode {
        &self.nodes[id.0]
    }
}

/// Pre-order iterator over node handles
pub struct Descendants<'a> {
    tree: &'a StructuralTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.raw(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}

/// Copyable handle to a node plus its tree
///
/// Handles from different trees can be compared with
/// [`NodeRef::equals_blocks`] and [`NodeRef::equals_layout`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a StructuralTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a StructuralTree {
        self.tree
    }

    pub fn node(&self) -> &'a StructuralNode {
        self.tree.raw(self.id)
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn canonical_text(&self) -> Cow<'a, str> {
        self.node().canonical_text()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    /// Position among all siblings (0 for the root)
    pub fn sibling_index(&self) -> usize {
        self.parent()
            .and_then(|p| p.node().children.iter().position(|&c| c == self.id))
            .unwrap_or(0)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", self.kind())
            .field("text", &self.node().text)
            .finish()
    }
}
