//! Controller behavior against the in-memory remote store.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use rstest::{fixture, rstest};

use chaintree::application::{
    ApplicationError, ApplyOutcome, ReconcileMode, Status, TreeController,
};
use chaintree::domain::{
    ActiveItem, AddCommand, ChainDetail, ChainId, DeleteCommand, DomainError, DragEnd,
    DragIntentResolver, DropTarget, EditCommand, ElementType, MoveCommand, MoveRejection,
    NestedNode, NewNode, Node, NodeId, TREE_CONTAINER_ID,
};
use chaintree::infrastructure::{
    GatewayCall, GatewayError, GatewayResult, InMemoryGateway, RemoteGateway, RemoteOperation,
};

use common::{chain_id, id, seeded_gateway, CHAIN};

#[fixture]
fn gateway() -> Arc<InMemoryGateway> {
    Arc::new(seeded_gateway())
}

async fn loaded(gateway: &Arc<InMemoryGateway>, mode: ReconcileMode) -> TreeController {
    let controller = TreeController::with_options(
        gateway.clone(),
        mode,
        DragIntentResolver::default(),
    );
    controller.load(&chain_id()).await.unwrap();
    gateway.clear_calls();
    controller
}

fn move_cmd(node: &str, parent: Option<&str>) -> EditCommand {
    MoveCommand {
        node_id: id(node),
        new_parent_id: parent.map(id),
    }
    .into()
}

fn add_cmd(element_type: &str, parent: Option<&str>) -> EditCommand {
    AddCommand {
        element_type_id: element_type.into(),
        parent_id: parent.map(id),
        chain_id: chain_id(),
    }
    .into()
}

// ============================================================
// Loading
// ============================================================

#[rstest]
#[tokio::test]
async fn given_chain_when_loading_then_ready_with_tree_and_catalog(gateway: Arc<InMemoryGateway>) {
    // Arrange
    let controller = TreeController::new(gateway.clone());
    assert_eq!(controller.state().status, Status::Idle);

    // Act
    controller.load(&chain_id()).await.unwrap();

    // Assert
    let state = controller.state();
    assert_eq!(state.status, Status::Ready);
    assert!(state.error.is_none());
    let chain = state.chain.as_ref().unwrap();
    assert_eq!(chain.name, "Pump line");
    assert_eq!(chain.tree.len(), 5);
    chain.tree.check_invariants().unwrap();
    assert_eq!(state.element_types.len(), 5);
    assert_eq!(state.nested(), common::sample_chain().root_nodes);
}

#[rstest]
#[tokio::test]
async fn given_failing_catalog_when_loading_then_ready_without_data(
    gateway: Arc<InMemoryGateway>,
) {
    // Arrange
    let controller = TreeController::new(gateway.clone());
    gateway.fail_next(RemoteOperation::FetchElementTypes);

    // Act
    let err = controller.load(&chain_id()).await.unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::LoadFailed { .. }));
    let state = controller.state();
    assert_eq!(state.status, Status::Ready);
    assert!(state.chain.is_none());
    assert!(state.element_types.is_empty());
    assert!(state.error.unwrap().contains("fetch element types"));
}

#[rstest]
#[tokio::test]
async fn given_unknown_chain_when_loading_then_load_failed(gateway: Arc<InMemoryGateway>) {
    let controller = TreeController::new(gateway);
    let err = controller.load(&ChainId::from("99")).await.unwrap_err();
    assert!(matches!(err, ApplicationError::LoadFailed { chain_id, .. } if chain_id.as_str() == "99"));
}

struct MalformedGateway;

#[async_trait]
impl RemoteGateway for MalformedGateway {
    async fn fetch_chain_detail(&self, chain_id: &ChainId) -> GatewayResult<ChainDetail> {
        Ok(ChainDetail {
            id: chain_id.clone(),
            name: "broken".to_string(),
            root_nodes: vec![
                NestedNode::new("1", "pump").with_child(NestedNode::new("2", "pipe")),
                NestedNode::new("2", "pipe"),
            ],
        })
    }

    async fn fetch_element_types(&self) -> GatewayResult<Vec<ElementType>> {
        Ok(common::catalog())
    }

    async fn create_node(&self, _new_node: &NewNode) -> GatewayResult<Node> {
        Err(GatewayError::Status {
            status: 500,
            message: "unused".to_string(),
        })
    }

    async fn delete_node(&self, _node_id: &NodeId) -> GatewayResult<()> {
        Ok(())
    }

    async fn move_node(&self, _node_id: &NodeId, _new_parent_id: Option<&NodeId>) -> GatewayResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn given_malformed_snapshot_when_loading_then_nothing_published() {
    let controller = TreeController::new(Arc::new(MalformedGateway));

    let err = controller.load(&chain_id()).await.unwrap_err();

    assert!(matches!(err, ApplicationError::LoadFailed { .. }));
    let state = controller.state();
    assert!(state.chain.is_none());
    assert!(state.error.unwrap().contains("duplicate"));
}

#[rstest]
#[tokio::test]
async fn given_subscriber_when_loading_then_sees_ready_state(gateway: Arc<InMemoryGateway>) {
    let controller = TreeController::new(gateway);
    let mut rx = controller.subscribe();

    controller.load(&chain_id()).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.status, Status::Ready);
    assert_eq!(state.chain_id(), Some(&chain_id()));
}

#[rstest]
#[tokio::test]
async fn given_loaded_controller_when_teardown_then_idle_and_not_loaded(
    gateway: Arc<InMemoryGateway>,
) {
    let controller = loaded(&gateway, ReconcileMode::Reload).await;

    controller.teardown();

    let state = controller.state();
    assert_eq!(state.status, Status::Idle);
    assert!(state.chain.is_none());
    let err = controller.apply(move_cmd("4", Some("2"))).await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotLoaded));
    assert!(gateway.mutation_calls().is_empty());
}

// ============================================================
// Scenarios
// ============================================================

#[rstest]
#[tokio::test]
async fn given_root_dropped_on_container_then_no_remote_call(gateway: Arc<InMemoryGateway>) {
    // Arrange
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    let before = controller.state().nested();

    // Act
    let outcome = controller
        .handle_drop(&DragEnd {
            active: ActiveItem::node("1"),
            over: Some(DropTarget::new(TREE_CONTAINER_ID)),
        })
        .await
        .unwrap();

    // Assert
    assert_eq!(outcome, ApplyOutcome::Unchanged);
    assert!(gateway.calls().is_empty());
    assert_eq!(controller.state().nested(), before);
}

#[rstest]
#[tokio::test]
async fn given_palette_item_dropped_on_node_then_created_and_reloaded(
    gateway: Arc<InMemoryGateway>,
) {
    // Arrange
    let controller = loaded(&gateway, ReconcileMode::Reload).await;

    // Act
    let outcome = controller
        .handle_drop(&DragEnd {
            active: ActiveItem::palette("valve"),
            over: Some(DropTarget::new("1")),
        })
        .await
        .unwrap();

    // Assert
    let created = match outcome {
        ApplyOutcome::Applied { created: Some(created) } => created,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(
        gateway.mutation_calls(),
        vec![GatewayCall::CreateNode(NewNode {
            element_type_id: "valve".into(),
            parent_id: Some(id("1")),
            chain_id: chain_id(),
        })]
    );
    assert!(gateway
        .calls()
        .contains(&GatewayCall::FetchChainDetail(chain_id())));

    let state = controller.state();
    assert_eq!(state.status, Status::Ready);
    let tree = state.tree().unwrap();
    assert_eq!(tree.parent_of(&created).unwrap(), Some(&id("1")));
    assert!(!created.is_provisional());
    tree.check_invariants().unwrap();
}

#[rstest]
#[tokio::test]
async fn given_node_dropped_on_own_descendant_then_invalid_move_without_call(
    gateway: Arc<InMemoryGateway>,
) {
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    let before = controller.state().nested();

    let err = controller
        .handle_drop(&DragEnd {
            active: ActiveItem::node("3"),
            over: Some(DropTarget::new("5")),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidMove {
            reason: MoveRejection::IntoOwnSubtree,
            ..
        })
    ));
    assert!(gateway.calls().is_empty());
    assert_eq!(controller.state().nested(), before);
}

#[rstest]
#[tokio::test]
async fn given_failing_delete_then_tree_unchanged_and_error_set(gateway: Arc<InMemoryGateway>) {
    // Arrange
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    let before = controller.state().nested();
    gateway.fail_next(RemoteOperation::DeleteNode);

    // Act
    let err = controller
        .apply(DeleteCommand { node_id: id("4") }.into())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::RemoteOperationFailed {
            operation: RemoteOperation::DeleteNode,
            ..
        }
    ));
    let state = controller.state();
    assert_eq!(state.status, Status::Ready);
    assert_eq!(state.nested(), before);
    let message = state.error.unwrap();
    assert!(message.contains("delete node failed"), "{message}");

    // never retried
    assert_eq!(gateway.mutation_calls().len(), 1);
}

// ============================================================
// Local rejection
// ============================================================

#[rstest]
#[case::move_onto_itself(move_cmd("3", Some("3")))]
#[case::move_into_subtree(move_cmd("1", Some("5")))]
#[case::move_missing_node(move_cmd("42", Some("1")))]
#[case::move_to_missing_parent(move_cmd("4", Some("42")))]
#[case::add_under_missing_parent(add_cmd("valve", Some("42")))]
#[case::add_unknown_type(add_cmd("turbine", None))]
#[case::add_disabled_type(add_cmd("legacy", None))]
#[case::delete_missing(DeleteCommand { node_id: id("42") }.into())]
#[case::add_other_chain(AddCommand { element_type_id: "valve".into(), parent_id: None, chain_id: "8".into() }.into())]
#[tokio::test]
async fn given_invalid_command_then_rejected_without_side_effects(
    gateway: Arc<InMemoryGateway>,
    #[case] command: EditCommand,
) {
    // Arrange
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    let before = controller.state().nested();
    let mut rx = controller.subscribe();
    let _ = rx.borrow_and_update();

    // Act
    let err = controller.apply(command).await.unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Domain(_)), "{err:?}");
    assert!(err.is_rejection());
    assert!(gateway.calls().is_empty());
    assert!(!rx.has_changed().unwrap());
    let state = controller.state();
    assert_eq!(state.nested(), before);
    assert!(state.error.is_none());
    assert_eq!(state.status, Status::Ready);
}

#[rstest]
#[tokio::test]
async fn given_nothing_loaded_when_applying_then_not_loaded(gateway: Arc<InMemoryGateway>) {
    let controller = TreeController::new(gateway.clone());

    let err = controller.apply(add_cmd("valve", None)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotLoaded));

    let err = controller
        .handle_drop(&DragEnd {
            active: ActiveItem::node("1"),
            over: Some(DropTarget::new("2")),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::NotLoaded));
    assert!(gateway.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn given_drop_outside_any_zone_then_unchanged(gateway: Arc<InMemoryGateway>) {
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    let outcome = controller
        .handle_drop(&DragEnd {
            active: ActiveItem::node("4"),
            over: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::Unchanged);
    assert!(gateway.calls().is_empty());
}

// ============================================================
// Reconciliation
// ============================================================

#[rstest]
#[case(ReconcileMode::Reload)]
#[case(ReconcileMode::Patch)]
#[tokio::test]
async fn given_edit_sequence_then_local_tree_matches_remote(
    gateway: Arc<InMemoryGateway>,
    #[case] mode: ReconcileMode,
) {
    // Arrange
    let controller = loaded(&gateway, mode).await;

    // Act
    let outcome = controller.apply(add_cmd("valve", Some("2"))).await.unwrap();
    controller.apply(move_cmd("4", Some("2"))).await.unwrap();
    controller.apply(move_cmd("5", None)).await.unwrap();
    controller
        .apply(DeleteCommand { node_id: id("3") }.into())
        .await
        .unwrap();

    // Assert
    let created = match outcome {
        ApplyOutcome::Applied { created: Some(created) } => created,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let state = controller.state();
    let tree = state.tree().unwrap();
    tree.check_invariants().unwrap();
    assert_eq!(tree.parent_of(&created).unwrap(), Some(&id("2")));
    assert_eq!(tree.parent_of(&id("4")).unwrap(), Some(&id("2")));
    assert_eq!(tree.parent_of(&id("5")).unwrap(), None);
    assert!(!tree.contains(&id("3")));

    let remote = gateway.snapshot(&chain_id()).unwrap();
    assert_eq!(state.nested(), remote.root_nodes);

    let reloads = gateway
        .calls()
        .iter()
        .filter(|c| matches!(c, GatewayCall::FetchChainDetail(_)))
        .count();
    match mode {
        ReconcileMode::Reload => assert_eq!(reloads, 4),
        ReconcileMode::Patch => assert_eq!(reloads, 0),
    }
}

#[rstest]
#[tokio::test]
async fn given_reload_failure_after_mutation_then_stale_tree_dropped(
    gateway: Arc<InMemoryGateway>,
) {
    let controller = loaded(&gateway, ReconcileMode::Reload).await;
    gateway.fail_next(RemoteOperation::FetchChainDetail);

    let err = controller.apply(move_cmd("4", Some("2"))).await.unwrap_err();

    assert!(matches!(err, ApplicationError::LoadFailed { .. }));
    assert_eq!(gateway.mutation_calls().len(), 1);
    let state = controller.state();
    assert_eq!(state.status, Status::Ready);
    assert!(state.error.is_some());
    assert!(state.chain.is_none());
    assert!(state.element_types.is_empty());

    // nothing to edit until the chain is loaded again
    let err = controller.apply(move_cmd("4", None)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotLoaded));

    // the next load catches up with the remote store
    controller.load(&chain_id()).await.unwrap();
    let state = controller.state();
    assert!(state.error.is_none());
    assert_eq!(state.tree().unwrap().parent_of(&id("4")).unwrap(), Some(&id("2")));
}

#[rstest]
#[tokio::test]
async fn given_failure_then_next_success_clears_error(gateway: Arc<InMemoryGateway>) {
    let controller = loaded(&gateway, ReconcileMode::Patch).await;
    gateway.fail_next(RemoteOperation::MoveNode);

    controller.apply(move_cmd("4", Some("2"))).await.unwrap_err();
    assert!(controller.state().error.is_some());

    controller.apply(move_cmd("4", Some("2"))).await.unwrap();
    let state = controller.state();
    assert!(state.error.is_none());
    assert_eq!(state.tree().unwrap().parent_of(&id("4")).unwrap(), Some(&id("2")));
    assert_eq!(state.chain_id().map(|c| c.as_str()), Some(CHAIN));
}
