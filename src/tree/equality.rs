//! Structural and layout equality between nodes, possibly of different trees

use super::eq_ignore_case;
use super::node::{NodeId, NodeRef, StructuralTree};

impl<'a> NodeRef<'a> {
    /// Same child count and case-insensitively equal canonical text at every
    /// position of both subtrees
    pub fn equals_blocks(&self, other: &NodeRef<'_>) -> bool {
        if self.child_count() != other.child_count() {
            return false;
        }
        if !eq_ignore_case(&self.canonical_text(), &other.canonical_text()) {
            return false;
        }
        self.children()
            .zip(other.children())
            .all(|(a, b)| a.equals_blocks(&b))
    }

    /// Equal layout IDs and pairwise layout-equal shape children
    ///
    /// Non-shape children are skipped independently on each side, so adding
    /// plain statements to a loop body does not change the outcome.
    pub fn equals_layout(&self, other: &NodeRef<'_>) -> bool {
        let (Some(mine), Some(theirs)) = (self.layout_id(), other.layout_id()) else {
            return false;
        };
        if !eq_ignore_case(&mine, &theirs) {
            return false;
        }

        let mut left = self.children().filter(|c| c.kind().is_shape());
        let mut right = other.children().filter(|c| c.kind().is_shape());
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => {
                    if !a.equals_layout(&b) {
                        return false;
                    }
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl StructuralTree {
    /// Every node (pre-order) that is block-equal to `reference`
    pub fn search_equal_blocks(&self, reference: &NodeRef<'_>) -> Vec<NodeId> {
        self.iter()
            .filter(|candidate| candidate.equals_blocks(reference))
            .map(|candidate| candidate.node_id())
            .collect()
    }
}
