//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use chaintree::domain::{
    ChainDetail, ChainId, ElementType, NestedNode, NewNode, Node, NodeId,
};
use chaintree::infrastructure::{
    GatewayResult, InMemoryGateway, RemoteGateway, RemoteOperation,
};
use chaintree::util::testing;

pub const CHAIN: &str = "7";

/// Chain 7:
/// ```text
/// 1 pump
/// ├── 3 pipe
/// │   └── 5 valve
/// └── 4 pipe
/// 2 tank
/// ```
pub fn sample_chain() -> ChainDetail {
    ChainDetail {
        id: CHAIN.into(),
        name: "Pump line".to_string(),
        root_nodes: vec![
            NestedNode::new("1", "pump")
                .with_label("Pump")
                .with_child(NestedNode::new("3", "pipe").with_child(NestedNode::new("5", "valve")))
                .with_child(NestedNode::new("4", "pipe")),
            NestedNode::new("2", "tank"),
        ],
    }
}

pub fn catalog() -> Vec<ElementType> {
    let mut legacy = ElementType::new("legacy", "Legacy pump");
    legacy.enabled = false;
    vec![
        ElementType::new("pump", "Pump"),
        ElementType::new("pipe", "Pipe"),
        ElementType::new("valve", "Valve"),
        ElementType::new("tank", "Tank"),
        legacy,
    ]
}

pub fn seeded_gateway() -> InMemoryGateway {
    testing::init_test_setup();
    InMemoryGateway::new()
        .with_element_types(catalog())
        .with_chain(sample_chain())
        .unwrap()
}

pub fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

pub fn chain_id() -> ChainId {
    ChainId::from(CHAIN)
}

/// Gateway that can hold chosen calls until released and that tracks how
/// many mutations run at the same time.
pub struct GatedGateway {
    pub inner: InMemoryGateway,
    gated_ops: Mutex<HashSet<RemoteOperation>>,
    gated_chains: Mutex<HashSet<ChainId>>,
    release: Semaphore,
    /// Signalled each time a call stops at the gate
    pub entered: Notify,
    mutations_in_flight: AtomicUsize,
    max_mutations_in_flight: AtomicUsize,
}

impl GatedGateway {
    pub fn new(inner: InMemoryGateway) -> Self {
        Self {
            inner,
            gated_ops: Mutex::new(HashSet::new()),
            gated_chains: Mutex::new(HashSet::new()),
            release: Semaphore::new(0),
            entered: Notify::new(),
            mutations_in_flight: AtomicUsize::new(0),
            max_mutations_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn gate(&self, op: RemoteOperation) {
        self.gated_ops.lock().insert(op);
    }

    pub fn ungate(&self, op: RemoteOperation) {
        self.gated_ops.lock().remove(&op);
    }

    /// Hold chain-detail fetches of one chain only.
    pub fn gate_chain(&self, chain: &ChainId) {
        self.gated_chains.lock().insert(chain.clone());
    }

    pub fn open(&self, calls: usize) {
        self.release.add_permits(calls);
    }

    pub fn max_mutations_in_flight(&self) -> usize {
        self.max_mutations_in_flight.load(Ordering::SeqCst)
    }

    async fn pass(&self, op: RemoteOperation, chain: Option<&ChainId>) {
        let held = self.gated_ops.lock().contains(&op)
            || chain.is_some_and(|c| self.gated_chains.lock().contains(c));
        if held {
            self.entered.notify_one();
            self.release.acquire().await.unwrap().forget();
        }
    }

    async fn mutation<T>(
        &self,
        op: RemoteOperation,
        call: impl std::future::Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        let now = self.mutations_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_mutations_in_flight.fetch_max(now, Ordering::SeqCst);
        self.pass(op, None).await;
        let result = call.await;
        self.mutations_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl RemoteGateway for GatedGateway {
    async fn fetch_chain_detail(&self, chain_id: &ChainId) -> GatewayResult<ChainDetail> {
        self.pass(RemoteOperation::FetchChainDetail, Some(chain_id)).await;
        self.inner.fetch_chain_detail(chain_id).await
    }

    async fn fetch_element_types(&self) -> GatewayResult<Vec<ElementType>> {
        self.pass(RemoteOperation::FetchElementTypes, None).await;
        self.inner.fetch_element_types().await
    }

    async fn create_node(&self, new_node: &NewNode) -> GatewayResult<Node> {
        self.mutation(RemoteOperation::CreateNode, self.inner.create_node(new_node))
            .await
    }

    async fn delete_node(&self, node_id: &NodeId) -> GatewayResult<()> {
        self.mutation(RemoteOperation::DeleteNode, self.inner.delete_node(node_id))
            .await
    }

    async fn move_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> GatewayResult<()> {
        self.mutation(
            RemoteOperation::MoveNode,
            self.inner.move_node(node_id, new_parent_id),
        )
        .await
    }
}

pub fn shared<G: RemoteGateway + 'static>(gateway: G) -> Arc<G> {
    Arc::new(gateway)
}
