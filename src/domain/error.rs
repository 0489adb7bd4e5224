//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent violated tree invariants or bad operator parameters.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl DomainError {
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Tree invariant violations, detected when a tree is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedInput {
    #[error("reconstruction has no nodes")]
    Empty,

    #[error("no root node (every node has a parent)")]
    NoRoot,

    #[error("multiple root nodes: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("node {node} references missing parent {parent}")]
    DanglingParent { node: NodeId, parent: NodeId },

    #[error("cycle detected through node {0}")]
    Cycle(NodeId),

    #[error("invalid record for node {node}: {reason}")]
    InvalidRecord { node: NodeId, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
