//! Tree builder: validates tabular node records and assembles the arena.

use std::collections::{BTreeMap, HashSet};

use generational_arena::Arena;
use tracing::{debug, instrument};

use crate::domain::error::{DomainResult, MalformedInput};
use crate::domain::node::{Node, NodeId};
use crate::domain::tree::{Tree, TreeNode};

/// Constructs a [`Tree`] from flat node records (one per SWC row).
///
/// Every structural invariant is checked here, so operators never see a
/// malformed tree:
/// - exactly one root
/// - unique ids
/// - no dangling parent references
/// - no cycles
/// - finite coordinates, finite non-negative radii
#[derive(Debug, Default)]
pub struct TreeBuilder {
    visited: HashSet<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "debug", skip_all)]
    pub fn build(&mut self, nodes: impl IntoIterator<Item = Node>) -> DomainResult<Tree> {
        self.visited.clear();

        let mut records: BTreeMap<NodeId, Node> = BTreeMap::new();
        for node in nodes {
            Self::check_record(&node)?;
            if records.contains_key(&node.id) {
                return Err(MalformedInput::DuplicateId(node.id).into());
            }
            records.insert(node.id, node);
        }
        if records.is_empty() {
            return Err(MalformedInput::Empty.into());
        }

        let roots: Vec<NodeId> = records
            .values()
            .filter(|n| n.is_root())
            .map(|n| n.id)
            .collect();
        let root_id = match roots.as_slice() {
            [] => return Err(MalformedInput::NoRoot.into()),
            [single] => *single,
            _ => return Err(MalformedInput::MultipleRoots(roots).into()),
        };

        // Parent -> children relationship cache, children ascending by id
        let mut relationships: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for node in records.values() {
            if let Some(parent) = node.parent {
                if !records.contains_key(&parent) {
                    return Err(MalformedInput::DanglingParent {
                        node: node.id,
                        parent,
                    }
                    .into());
                }
                relationships.entry(parent).or_default().push(node.id);
            }
        }

        let mut arena = Arena::with_capacity(records.len());
        let mut ids = BTreeMap::new();
        let mut root = None;
        let mut stack = vec![(root_id, None)];

        while let Some((current, parent_idx)) = stack.pop() {
            if !self.visited.insert(current) {
                return Err(MalformedInput::Cycle(current).into());
            }
            let Some(data) = records.remove(&current) else {
                return Err(MalformedInput::Cycle(current).into());
            };
            let idx = arena.insert(TreeNode {
                data,
                parent: parent_idx,
                children: Vec::new(),
            });
            ids.insert(current, idx);
            // Depth-first with ascending pops keeps children lists sorted by id
            match parent_idx {
                Some(parent_idx) => arena[parent_idx].children.push(idx),
                None => root = Some(idx),
            }
            if let Some(children) = relationships.get(&current) {
                for child in children.iter().rev() {
                    stack.push((*child, Some(idx)));
                }
            }
        }

        // With one root and no dangling parents, anything unreachable from
        // the root sits on a parent cycle.
        if let Some(stranded) = records.keys().next() {
            return Err(MalformedInput::Cycle(*stranded).into());
        }

        let Some(root) = root else {
            return Err(MalformedInput::NoRoot.into());
        };
        let tree = Tree::from_parts(arena, root, ids);
        debug!("built {}", tree);
        Ok(tree)
    }

    fn check_record(node: &Node) -> DomainResult<()> {
        let invalid = |reason: &str| -> DomainResult<()> {
            Err(MalformedInput::InvalidRecord {
                node: node.id,
                reason: reason.to_string(),
            }
            .into())
        };
        if !node.position.is_finite() {
            return invalid("non-finite coordinate");
        }
        if !node.radius.is_finite() || node.radius < 0.0 {
            return invalid("radius must be finite and non-negative");
        }
        if node.parent == Some(node.id) {
            return Err(MalformedInput::Cycle(node.id).into());
        }
        Ok(())
    }
}
