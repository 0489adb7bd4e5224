//! Immutable neuron tree over a generational arena
//!
//! A `Tree` is only produced by `TreeBuilder` and is never mutated in
//! place: operators derive new trees through the crate-private
//! `map_positions` and `without_subtrees`, so ids, parents and the single
//! root stay consistent with what the builder validated.

use std::collections::BTreeMap;
use std::fmt;

use generational_arena::{Arena, Index};
use glam::DVec3;
use tracing::instrument;

use crate::domain::node::{Node, NodeId};

/// Tree node in the arena-based reconstruction.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Traced point carried by this node
    pub data: Node,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, ordered by node id
    pub children: Vec<Index>,
}

/// Arena-based neuron reconstruction.
///
/// A `Tree` is an immutable value: it is produced by [`TreeBuilder`] (which
/// checks every structural invariant) or derived from another tree by a
/// perturbation operator, and it has no public mutators. Children lists and
/// the id lookup table are computed once, at construction.
///
/// [`TreeBuilder`]: crate::domain::TreeBuilder
#[derive(Debug, Clone)]
pub struct Tree {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node
    root: Index,
    /// Node id -> arena index
    ids: BTreeMap<NodeId, Index>,
}

impl Tree {
    /// Assemble a tree from a pre-validated arena. Only the builder calls this.
    pub(crate) fn from_parts(
        arena: Arena<TreeNode>,
        root: Index,
        ids: BTreeMap<NodeId, Index>,
    ) -> Self {
        Self { arena, root, ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn root(&self) -> &Node {
        &self.arena[self.root].data
    }

    pub fn root_id(&self) -> NodeId {
        self.root().id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.ids.get(&id).map(|&idx| &self.arena[idx].data)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains_key(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.ids.values().map(move |&idx| &self.arena[idx].data)
    }

    /// Ids of all nodes in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids.keys().copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        let idx = *self.ids.get(&id)?;
        self.arena[idx].parent.map(|p| &self.arena[p].data)
    }

    /// Children of `id`, ordered by id. Empty for unknown ids.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.ids
            .get(&id)
            .map(|&idx| self.arena[idx].children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&c| &self.arena[c].data)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.ids
            .get(&id)
            .map(|&idx| self.arena[idx].children.len())
            .unwrap_or(0)
    }

    /// Length of the segment joining `id` to its parent (0 for the root).
    pub fn segment_length(&self, id: NodeId) -> f64 {
        match (self.get(id), self.parent(id)) {
            (Some(node), Some(parent)) => node.position.distance(parent.position),
            _ => 0.0,
        }
    }

    /// Sum of all segment lengths.
    pub fn total_length(&self) -> f64 {
        self.ids().map(|id| self.segment_length(id)).sum()
    }

    /// Pre-order (depth-first, root first) traversal.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Post-order traversal (children before their parent).
    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Pre-order traversal of the subtree rooted at `id` (including `id`).
    pub fn subtree(&self, id: NodeId) -> TreeIterator<'_> {
        match self.ids.get(&id) {
            Some(&idx) => TreeIterator::new(self, idx),
            None => TreeIterator {
                tree: self,
                stack: Vec::new(),
            },
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut depth_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut max = 0;
        for node in self.iter() {
            let depth = node
                .parent
                .and_then(|p| depth_of.get(&p).copied())
                .unwrap_or(0)
                + 1;
            max = max.max(depth);
            depth_of.insert(node.id, depth);
        }
        max
    }

    /// Ids of all nodes without children, ascending.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| self.child_count(n.id) == 0)
            .map(|n| n.id)
            .collect()
    }

    /// Ids of all nodes with more than one child, ascending.
    pub fn branch_points(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| self.child_count(n.id) > 1)
            .map(|n| n.id)
            .collect()
    }

    /// Parent id of every node, keyed by id. Two trees share a topology iff
    /// these maps are equal.
    pub fn topology(&self) -> BTreeMap<NodeId, Option<NodeId>> {
        self.nodes().map(|n| (n.id, n.parent)).collect()
    }

    /// New tree with the same topology and `position` replaced by `f(node)`.
    pub(crate) fn map_positions(&self, mut f: impl FnMut(&Node) -> DVec3) -> Tree {
        let mut next = self.clone();
        for (_, tree_node) in next.arena.iter_mut() {
            tree_node.data.position = f(&tree_node.data);
        }
        next
    }

    /// New tree with the subtrees rooted at `starts` removed.
    ///
    /// The root is never removed; ids not present are ignored.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn without_subtrees(&self, starts: &[NodeId]) -> Tree {
        let mut next = self.clone();
        for start in starts {
            let Some(&idx) = next.ids.get(start) else {
                continue;
            };
            if idx == next.root {
                continue;
            }
            if let Some(parent_idx) = next.arena[idx].parent {
                next.arena[parent_idx].children.retain(|&c| c != idx);
            }
            let mut stack = vec![idx];
            while let Some(current) = stack.pop() {
                if let Some(removed) = next.arena.remove(current) {
                    next.ids.remove(&removed.data.id);
                    stack.extend(removed.children);
                }
            }
        }
        next
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.root_id() == other.root_id()
            && self.nodes().zip(other.nodes()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tree(root={}, nodes={}, depth={})",
            self.root_id(),
            self.len(),
            self.depth()
        )
    }
}

pub struct TreeIterator<'a> {
    tree: &'a Tree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a Tree, start: Index) -> Self {
        Self {
            tree,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.tree.arena.get(current_idx)?;
        // Push children in reverse order for ascending-id traversal
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(&node.data)
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a Tree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            stack: vec![(tree.root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.arena.get(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(&node.data);
                }
            }
        }
        None
    }
}
