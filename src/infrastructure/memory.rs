//! In-memory remote store
//!
//! Behaves like the backend for tests and offline use: sequential ids for
//! created nodes, cascading deletes, a call log and one-shot failure injection.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::domain::{
    ChainDetail, ChainId, DomainError, DomainResult, ElementType, NewNode, Node, NodeId,
    TreeArena, TreeBuilder,
};
use crate::infrastructure::traits::{GatewayError, GatewayResult, RemoteGateway, RemoteOperation};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    FetchChainDetail(ChainId),
    FetchElementTypes,
    CreateNode(NewNode),
    DeleteNode(NodeId),
    MoveNode {
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
    },
}

impl GatewayCall {
    pub fn operation(&self) -> RemoteOperation {
        match self {
            GatewayCall::FetchChainDetail(_) => RemoteOperation::FetchChainDetail,
            GatewayCall::FetchElementTypes => RemoteOperation::FetchElementTypes,
            GatewayCall::CreateNode(_) => RemoteOperation::CreateNode,
            GatewayCall::DeleteNode(_) => RemoteOperation::DeleteNode,
            GatewayCall::MoveNode { .. } => RemoteOperation::MoveNode,
        }
    }
}

struct StoredChain {
    name: String,
    tree: TreeArena,
}

#[derive(Default)]
struct Store {
    chains: HashMap<ChainId, StoredChain>,
    element_types: Vec<ElementType>,
    next_id: u64,
    calls: Vec<GatewayCall>,
    fail_next: HashSet<RemoteOperation>,
}

impl Store {
    /// Record the call and consume a pending injected failure for it.
    fn enter(&mut self, call: GatewayCall) -> GatewayResult<()> {
        let op = call.operation();
        self.calls.push(call);
        if self.fail_next.remove(&op) {
            debug!("injecting failure for {}", op);
            return Err(GatewayError::Injected(op));
        }
        Ok(())
    }

    fn chain_of(&mut self, node_id: &NodeId) -> GatewayResult<&mut StoredChain> {
        self.chains
            .values_mut()
            .find(|c| c.tree.contains(node_id))
            .ok_or_else(|| GatewayError::NotFound(format!("node {node_id}")))
    }
}

fn rejected(err: DomainError) -> GatewayError {
    match err {
        DomainError::NotFound(id) => GatewayError::NotFound(format!("node {id}")),
        other => GatewayError::Status {
            status: 400,
            message: other.to_string(),
        },
    }
}

/// Remote gateway backed by process memory.
#[derive(Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a chain; fails when the snapshot is malformed.
    pub fn with_chain(self, detail: ChainDetail) -> DomainResult<Self> {
        let tree = TreeBuilder::new().build_from_snapshot(&detail.root_nodes)?;
        {
            let mut store = self.store.lock();
            let highest = tree
                .iter()
                .filter_map(|(_, node)| node.id.as_str().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            store.next_id = store.next_id.max(highest + 1);
            store.chains.insert(
                detail.id,
                StoredChain {
                    name: detail.name,
                    tree,
                },
            );
        }
        Ok(self)
    }

    pub fn with_element_types(self, element_types: Vec<ElementType>) -> Self {
        self.store.lock().element_types = element_types;
        self
    }

    /// Make the next call of `operation` fail with `GatewayError::Injected`.
    pub fn fail_next(&self, operation: RemoteOperation) {
        self.store.lock().fail_next.insert(operation);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.store.lock().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<GatewayCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation().is_mutation())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.store.lock().calls.clear();
    }

    /// Current remote view of a chain, without recording a call.
    pub fn snapshot(&self, chain_id: &ChainId) -> Option<ChainDetail> {
        self.store.lock().chains.get(chain_id).map(|c| ChainDetail {
            id: chain_id.clone(),
            name: c.name.clone(),
            root_nodes: c.tree.to_nested(),
        })
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    #[instrument(level = "trace", skip(self))]
    async fn fetch_chain_detail(&self, chain_id: &ChainId) -> GatewayResult<ChainDetail> {
        self.store
            .lock()
            .enter(GatewayCall::FetchChainDetail(chain_id.clone()))?;
        self.snapshot(chain_id)
            .ok_or_else(|| GatewayError::NotFound(format!("chain {chain_id}")))
    }

    #[instrument(level = "trace", skip(self))]
    async fn fetch_element_types(&self) -> GatewayResult<Vec<ElementType>> {
        let mut store = self.store.lock();
        store.enter(GatewayCall::FetchElementTypes)?;
        Ok(store.element_types.clone())
    }

    #[instrument(level = "trace", skip(self))]
    async fn create_node(&self, new_node: &NewNode) -> GatewayResult<Node> {
        let mut store = self.store.lock();
        store.enter(GatewayCall::CreateNode(new_node.clone()))?;

        let id = NodeId::from(store.next_id.max(1));
        let node = Node {
            id,
            element_type_id: new_node.element_type_id.clone(),
            parent_id: new_node.parent_id.clone(),
            label: String::new(),
        };
        let chain = store
            .chains
            .get_mut(&new_node.chain_id)
            .ok_or_else(|| GatewayError::NotFound(format!("chain {}", new_node.chain_id)))?;
        chain.tree = chain.tree.with_inserted_node(node.clone()).map_err(rejected)?;
        store.next_id = store.next_id.max(1) + 1;
        Ok(node)
    }

    #[instrument(level = "trace", skip(self))]
    async fn delete_node(&self, node_id: &NodeId) -> GatewayResult<()> {
        let mut store = self.store.lock();
        store.enter(GatewayCall::DeleteNode(node_id.clone()))?;
        let chain = store.chain_of(node_id)?;
        chain.tree = chain.tree.with_removed_node(node_id).map_err(rejected)?;
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    async fn move_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> GatewayResult<()> {
        let mut store = self.store.lock();
        store.enter(GatewayCall::MoveNode {
            node_id: node_id.clone(),
            new_parent_id: new_parent_id.cloned(),
        })?;
        let chain = store.chain_of(node_id)?;
        chain.tree = chain
            .tree
            .with_moved_node(node_id, new_parent_id)
            .map_err(rejected)?;
        Ok(())
    }
}
