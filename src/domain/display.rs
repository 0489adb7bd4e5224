//! Human-readable views of a tree: structural summary and branch outline.

use std::collections::BTreeMap;
use std::fmt;

use termtree::Tree as Outline;
use tracing::instrument;

use crate::domain::branch::{branches, Branch};
use crate::domain::node::NodeId;
use crate::domain::tree::Tree;

/// Structural counts of a reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSummary {
    pub nodes: usize,
    pub branches: usize,
    pub leaves: usize,
    pub branch_points: usize,
    pub depth: usize,
    pub total_length: f64,
}

impl TreeSummary {
    pub fn of(tree: &Tree) -> Self {
        Self {
            nodes: tree.len(),
            branches: branches(tree).len(),
            leaves: tree.leaves().len(),
            branch_points: tree.branch_points().len(),
            depth: tree.depth(),
            total_length: tree.total_length(),
        }
    }
}

impl fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:         {}", self.nodes)?;
        writeln!(f, "branches:      {}", self.branches)?;
        writeln!(f, "leaves:        {}", self.leaves)?;
        writeln!(f, "branch points: {}", self.branch_points)?;
        writeln!(f, "depth:         {}", self.depth)?;
        write!(f, "total length:  {:.2} µm", self.total_length)
    }
}

pub trait TreeOutline {
    fn to_outline(&self) -> Outline<String>;
}

impl TreeOutline for Tree {
    /// One outline entry per branch, nested the way branches hang off each other.
    #[instrument(level = "debug", skip(self))]
    fn to_outline(&self) -> Outline<String> {
        let all = branches(self);
        let by_terminal: BTreeMap<NodeId, &Branch> =
            all.iter().map(|b| (b.terminal(), b)).collect();

        let mut children: BTreeMap<NodeId, Vec<&Branch>> = BTreeMap::new();
        let mut root_branch = None;
        for branch in &all {
            match self.parent(branch.start()) {
                Some(parent) if by_terminal.contains_key(&parent.id) => {
                    children.entry(parent.id).or_default().push(branch)
                }
                _ => root_branch = Some(branch),
            }
        }

        fn build(branch: &Branch, children: &BTreeMap<NodeId, Vec<&Branch>>) -> Outline<String> {
            let mut outline = Outline::new(label(branch));
            if let Some(below) = children.get(&branch.terminal()) {
                for child in below {
                    outline.push(build(child, children));
                }
            }
            outline
        }

        match root_branch {
            Some(root) => build(root, &children),
            None => Outline::new("empty tree".to_string()),
        }
    }
}

fn label(branch: &Branch) -> String {
    let span = if branch.len() == 1 {
        format!("{}", branch.start())
    } else {
        format!("{}..{}", branch.start(), branch.terminal())
    };
    format!(
        "{} ({} nodes, {:.1} µm)",
        span,
        branch.len(),
        branch.path_length
    )
}
