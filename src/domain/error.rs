//! Domain-level errors (no external dependencies)

use std::fmt;

use thiserror::Error;

use crate::domain::entities::{ChainId, ElementTypeId, NodeId};

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// Node dropped onto itself
    OntoItself,
    /// Target lies inside the moved node's subtree
    IntoOwnSubtree,
    /// Moved node does not exist
    MissingNode,
    /// Target parent does not exist
    MissingParent,
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            MoveRejection::OntoItself => "node cannot become its own parent",
            MoveRejection::IntoOwnSubtree => "target is a descendant of the node",
            MoveRejection::MissingNode => "node does not exist",
            MoveRejection::MissingParent => "target parent does not exist",
        };
        f.write_str(reason)
    }
}

/// Domain errors represent violations of the tree invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("invalid move of node {node_id}: {reason}")]
    InvalidMove {
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        reason: MoveRejection,
    },

    #[error("invalid parent: node {0} does not exist")]
    InvalidParent(NodeId),

    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("element type {0} is unknown or not enabled")]
    UnknownElementType(ElementTypeId),

    #[error("command targets chain {actual} but chain {expected} is loaded")]
    ChainMismatch { expected: ChainId, actual: ChainId },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
