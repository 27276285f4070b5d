//! I/O boundary traits for testability
//!
//! The remote store is reached only through `RemoteGateway`, allowing the
//! controller to be tested against an in-memory implementation.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChainDetail, ChainId, ElementType, NewNode, Node, NodeId};

/// Remote calls the controller can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    FetchChainDetail,
    FetchElementTypes,
    CreateNode,
    DeleteNode,
    MoveNode,
}

impl RemoteOperation {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RemoteOperation::CreateNode | RemoteOperation::DeleteNode | RemoteOperation::MoveNode
        )
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::FetchChainDetail => "fetch chain detail",
            RemoteOperation::FetchElementTypes => "fetch element types",
            RemoteOperation::CreateNode => "create node",
            RemoteOperation::DeleteNode => "delete node",
            RemoteOperation::MoveNode => "move node",
        };
        f.write_str(name)
    }
}

/// Failure reported by a gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote store answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("cannot decode response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("injected failure for {0}")]
    Injected(RemoteOperation),
}

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Remote source of truth for chains and the element-type catalog.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Full chain with its nested node list.
    async fn fetch_chain_detail(&self, chain_id: &ChainId) -> GatewayResult<ChainDetail>;

    /// Element-type catalog (the palette).
    async fn fetch_element_types(&self) -> GatewayResult<Vec<ElementType>>;

    /// Create a node; the returned node carries the id assigned remotely.
    async fn create_node(&self, new_node: &NewNode) -> GatewayResult<Node>;

    /// Delete a node together with its subtree.
    async fn delete_node(&self, node_id: &NodeId) -> GatewayResult<()>;

    /// Re-parent a node; `None` makes it a root.
    async fn move_node(&self, node_id: &NodeId, new_parent_id: Option<&NodeId>)
        -> GatewayResult<()>;
}
