//! Branches: maximal unbranched paths derived from a tree.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::domain::node::NodeId;
use crate::domain::tree::Tree;

/// A maximal run of nodes with exactly one child each.
///
/// A branch starts at the root or at any node whose parent is a branch
/// point, and ends (inclusively) at the first leaf or branch point below.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Nodes from proximal (start) to distal (terminal)
    pub nodes: Vec<NodeId>,
    /// Whether the branch contains the root
    pub is_root: bool,
    /// Whether the branch ends in a leaf
    pub is_terminal: bool,
    /// Cable length, including the segment entering the start node
    pub path_length: f64,
    /// Nodes removed if this branch is dropped (start node and all descendants)
    pub subtree_size: usize,
    /// Cable length of everything from the start node down
    pub subtree_length: f64,
}

impl Branch {
    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn terminal(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Derive every branch of `tree`, in pre-order of their start nodes.
#[instrument(level = "debug", skip_all)]
pub fn branches(tree: &Tree) -> Vec<Branch> {
    let (sizes, lengths) = subtree_totals(tree);
    let root = tree.root_id();

    let mut result = Vec::new();
    for start in tree.iter().filter(|n| starts_branch(tree, n.id)) {
        let mut nodes = vec![start.id];
        let mut path_length = tree.segment_length(start.id);
        let mut current = start.id;
        while tree.child_count(current) == 1 {
            let Some(next) = tree.children(current).next() else {
                break;
            };
            current = next.id;
            path_length += tree.segment_length(current);
            nodes.push(current);
        }
        result.push(Branch {
            is_root: start.id == root,
            is_terminal: tree.child_count(current) == 0,
            path_length,
            subtree_size: sizes.get(&start.id).copied().unwrap_or(1),
            subtree_length: lengths.get(&start.id).copied().unwrap_or(0.0),
            nodes,
        });
    }
    result
}

fn starts_branch(tree: &Tree, id: NodeId) -> bool {
    match tree.parent(id) {
        None => true,
        Some(parent) => tree.child_count(parent.id) > 1,
    }
}

/// Node count and cable length of every subtree, in one post-order pass.
fn subtree_totals(tree: &Tree) -> (BTreeMap<NodeId, usize>, BTreeMap<NodeId, f64>) {
    let mut sizes: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut lengths: BTreeMap<NodeId, f64> = BTreeMap::new();
    for node in tree.iter_postorder() {
        let (size, length) = tree.children(node.id).fold((1, 0.0), |(s, l), child| {
            (s + sizes[&child.id], l + lengths[&child.id])
        });
        sizes.insert(node.id, size);
        lengths.insert(node.id, length + tree.segment_length(node.id));
    }
    (sizes, lengths)
}
