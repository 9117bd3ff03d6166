//! Node IDs and layout IDs
//!
//! Both identities are paths from the root. A node ID segment is
//! `index:text` where the index counts every sibling; a layout ID segment
//! uses the shape keyword and counts only shape siblings.

use super::node::{NodeId, NodeRef, StructuralTree};
use super::{eq_ignore_case, ID_SEPARATOR};

impl<'a> NodeRef<'a> {
    /// Order-derived identity
    pub fn id(&self) -> String {
        match self.parent() {
            None => self.canonical_text().into_owned(),
            Some(parent) => format!(
                "{}{}{}:{}",
                parent.id(),
                ID_SEPARATOR,
                self.sibling_index(),
                self.canonical_text()
            ),
        }
    }

    /// Shape-only identity; `None` for variable declarations
    pub fn layout_id(&self) -> Option<String> {
        let keyword = self.kind().layout_keyword()?;
        match self.parent() {
            None => Some(keyword.to_string()),
            Some(parent) => {
                let parent_layout = parent.layout_id()?;
                Some(format!(
                    "{}{}{}:{}",
                    parent_layout,
                    ID_SEPARATOR,
                    self.shape_index(),
                    keyword
                ))
            }
        }
    }

    /// Index among shape siblings; a non-shape node takes the index of the
    /// nearest preceding shape sibling, `-1` when there is none
    pub fn shape_index(&self) -> i64 {
        let Some(parent) = self.parent() else {
            return 0;
        };
        let mut index = -1;
        for sibling in parent.children() {
            if sibling.kind().is_shape() {
                index += 1;
            }
            if sibling.node_id() == self.node_id() {
                break;
            }
        }
        index
    }
}

impl StructuralTree {
    /// First node in pre-order whose ID equals `id` exactly
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        let root = self.root_ref();
        let root_id = root.canonical_text().into_owned();
        find_id(root, root_id, id)
    }

    /// First node in pre-order whose layout ID matches, ignoring case
    pub fn find_by_layout_id(&self, layout_id: &str) -> Option<NodeId> {
        if layout_id.is_empty() {
            return None;
        }
        let root = self.root_ref();
        let root_layout = root.kind().layout_keyword()?.to_string();
        find_layout(root, root_layout, &layout_id.to_lowercase())
    }
}

// Child IDs extend their parent's ID, so a subtree whose prefix does not
// match can be skipped.
fn find_id(node: NodeRef<'_>, node_id: String, query: &str) -> Option<NodeId> {
    if node_id == query {
        return Some(node.node_id());
    }
    if !query.starts_with(&node_id) {
        return None;
    }
    for (index, child) in node.children().enumerate() {
        let child_id = format!(
            "{}{}{}:{}",
            node_id,
            ID_SEPARATOR,
            index,
            child.canonical_text()
        );
        if let Some(found) = find_id(child, child_id, query) {
            return Some(found);
        }
    }
    None
}

fn find_layout(node: NodeRef<'_>, layout: String, query: &str) -> Option<NodeId> {
    if eq_ignore_case(&layout, query) {
        return Some(node.node_id());
    }
    if !query.starts_with(&layout.to_lowercase()) {
        return None;
    }
    let mut shape_index: i64 = -1;
    for child in node.children() {
        if child.kind().is_shape() {
            shape_index += 1;
        }
        let Some(keyword) = child.kind().layout_keyword() else {
            continue;
        };
        let child_layout = format!("{}{}{}:{}", layout, ID_SEPARATOR, shape_index, keyword);
        if let Some(found) = find_layout(child, child_layout, query) {
            return Some(found);
        }
    }
    None
}
