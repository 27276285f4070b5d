//! Tree controller
//!
//! Owns the published editor state, serializes structural edits against the
//! remote store and reconciles the local tree after each successful mutation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::application::state::{ChainView, EditorState, Status};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    ChainId, DomainError, DragEnd, DragIntentResolver, EditCommand, ElementType, Node, NodeId,
    TreeArena, TreeBuilder,
};
use crate::infrastructure::traits::{RemoteGateway, RemoteOperation};

/// How the local tree catches up with the remote store after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Re-fetch the whole chain
    #[default]
    Reload,
    /// Apply the validated local transform
    Patch,
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileMode::Reload => f.write_str("reload"),
            ReconcileMode::Patch => f.write_str("patch"),
        }
    }
}

impl FromStr for ReconcileMode {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reload" => Ok(ReconcileMode::Reload),
            "patch" => Ok(ReconcileMode::Patch),
            other => Err(ApplicationError::Config {
                message: format!("unknown reconcile mode '{other}', expected reload or patch"),
            }),
        }
    }
}

/// Result of a successful `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The command would not change the tree; nothing was sent
    Unchanged,
    /// The remote store accepted the command
    Applied { created: Option<NodeId> },
}

struct Inner {
    state: EditorState,
    /// Bumped by every load and by teardown; responses from older generations are dropped
    generation: u64,
    loading: bool,
    /// Ticket of the mutation currently talking to the remote store
    mutation: Option<u64>,
    next_ticket: u64,
}

/// Mutation admitted by `begin_mutation`, waiting for the remote answer.
struct PendingMutation {
    ticket: u64,
    generation: u64,
    chain_id: ChainId,
    /// Locally transformed tree for Move/Delete; None for Add
    local: Option<TreeArena>,
}

type Snapshot = (ChainView, Vec<ElementType>);

/// Client-side state controller for one chain editor.
///
/// Methods take `&self`: the controller is meant to be shared (e.g. behind an
/// `Arc`) between the drag layer and observers. State lives behind a mutex that
/// is never held across an await point.
pub struct TreeController {
    gateway: Arc<dyn RemoteGateway>,
    resolver: DragIntentResolver,
    mode: ReconcileMode,
    inner: Mutex<Inner>,
    publisher: watch::Sender<EditorState>,
}

impl TreeController {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self::with_options(gateway, ReconcileMode::default(), DragIntentResolver::default())
    }

    pub fn with_options(
        gateway: Arc<dyn RemoteGateway>,
        mode: ReconcileMode,
        resolver: DragIntentResolver,
    ) -> Self {
        let (publisher, _) = watch::channel(EditorState::default());
        Self {
            gateway,
            resolver,
            mode,
            inner: Mutex::new(Inner {
                state: EditorState::default(),
                generation: 0,
                loading: false,
                mutation: None,
                next_ticket: 0,
            }),
            publisher,
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Current published state.
    pub fn state(&self) -> EditorState {
        self.inner.lock().state.clone()
    }

    /// Receiver that sees every published state.
    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.publisher.subscribe()
    }

    /// Load a chain and the element-type catalog.
    ///
    /// Never rejected as busy: a newer load supersedes an older one, whose
    /// response is then dropped and reported as `Superseded` to its caller.
    #[instrument(level = "debug", skip(self, chain_id), fields(chain_id = %chain_id))]
    pub async fn load(&self, chain_id: &ChainId) -> ApplicationResult<()> {
        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.loading = true;
            inner.state.status = Status::Loading;
            self.publish(&inner.state);
            inner.generation
        };
        let _in_flight = InFlight {
            controller: self,
            work: Work::Load { generation },
        };

        let result = self.fetch_snapshot(chain_id).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("dropping stale response for chain {}", chain_id);
            return Err(ApplicationError::Superseded {
                chain_id: chain_id.clone(),
            });
        }
        inner.loading = false;
        match result {
            Ok((chain, element_types)) => {
                info!(nodes = chain.tree.len(), "loaded chain {}", chain_id);
                inner.state = EditorState {
                    status: Status::Ready,
                    error: None,
                    chain: Some(chain),
                    element_types: Arc::new(element_types),
                };
                self.publish(&inner.state);
                Ok(())
            }
            Err(err) => {
                warn!("load of chain {} failed: {}", chain_id, err);
                inner.state = EditorState {
                    status: Status::Ready,
                    error: Some(err.to_string()),
                    chain: None,
                    element_types: Arc::new(Vec::new()),
                };
                self.publish(&inner.state);
                Err(err)
            }
        }
    }

    /// Validate a command, send it to the remote store and reconcile.
    ///
    /// Local rejections (busy, nothing loaded, invalid edit) touch neither the
    /// gateway nor the published state.
    #[instrument(level = "debug", skip(self, command), fields(command = %command))]
    pub async fn apply(&self, command: EditCommand) -> ApplicationResult<ApplyOutcome> {
        let pending = match self.begin_mutation(&command)? {
            Some(pending) => pending,
            None => {
                debug!("command leaves the tree unchanged");
                return Ok(ApplyOutcome::Unchanged);
            }
        };

        let _in_flight = InFlight {
            controller: self,
            work: Work::Mutation {
                ticket: pending.ticket,
            },
        };

        let result = self.dispatch(&command).await;
        self.settle(pending, result).await
    }

    /// Resolve a drag-end event against the loaded chain and apply it.
    #[instrument(level = "debug", skip(self))]
    pub async fn handle_drop(&self, event: &DragEnd) -> ApplicationResult<ApplyOutcome> {
        let chain_id = self.loaded_chain_id()?;
        match self.resolver.resolve(event, &chain_id) {
            Some(command) => self.apply(command).await,
            None => Ok(ApplyOutcome::Unchanged),
        }
    }

    /// Back to Idle; responses of in-flight loads are dropped when they arrive.
    #[instrument(level = "debug", skip(self))]
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.loading = false;
        inner.state = EditorState::default();
        self.publish(&inner.state);
    }

    fn publish(&self, state: &EditorState) {
        debug!(status = %state.status, error = ?state.error, "publishing state");
        self.publisher.send_replace(state.clone());
    }

    fn loaded_chain_id(&self) -> ApplicationResult<ChainId> {
        self.inner
            .lock()
            .state
            .chain_id()
            .cloned()
            .ok_or(ApplicationError::NotLoaded)
    }

    async fn fetch_snapshot(&self, chain_id: &ChainId) -> ApplicationResult<Snapshot> {
        let (detail, element_types) = tokio::try_join!(
            async {
                self.gateway
                    .fetch_chain_detail(chain_id)
                    .await
                    .map_err(|e| ApplicationError::remote(RemoteOperation::FetchChainDetail, e))
            },
            async {
                self.gateway
                    .fetch_element_types()
                    .await
                    .map_err(|e| ApplicationError::remote(RemoteOperation::FetchElementTypes, e))
            },
        )
        .map_err(|e| ApplicationError::load_failed(chain_id, e))?;

        let tree = TreeBuilder::new()
            .build_from_snapshot(&detail.root_nodes)
            .map_err(|e| ApplicationError::load_failed(chain_id, e))?;

        let chain = ChainView {
            id: chain_id.clone(),
            name: detail.name,
            tree: Arc::new(tree),
        };
        Ok((chain, element_types))
    }

    /// Admit a mutation: busy check, local validation, then mark it in flight.
    ///
    /// Returns `None` when the command is a no-op.
    fn begin_mutation(&self, command: &EditCommand) -> ApplicationResult<Option<PendingMutation>> {
        let mut inner = self.inner.lock();
        if inner.loading || inner.mutation.is_some() {
            return Err(ApplicationError::Busy);
        }
        let chain = inner
            .state
            .chain
            .clone()
            .ok_or(ApplicationError::NotLoaded)?;
        let tree = chain.tree.as_ref();

        let local = match command {
            EditCommand::Move(cmd) => {
                let current_parent = tree.get(&cmd.node_id).map(|n| n.parent_id.as_ref());
                if current_parent == Some(cmd.new_parent_id.as_ref()) {
                    return Ok(None);
                }
                Some(tree.with_moved_node(&cmd.node_id, cmd.new_parent_id.as_ref())?)
            }
            EditCommand::Delete(cmd) => Some(tree.with_removed_node(&cmd.node_id)?),
            EditCommand::Add(cmd) => {
                if cmd.chain_id != chain.id {
                    return Err(DomainError::ChainMismatch {
                        expected: chain.id.clone(),
                        actual: cmd.chain_id.clone(),
                    }
                    .into());
                }
                match inner.state.element_type(&cmd.element_type_id) {
                    Some(et) if et.enabled => {}
                    _ => {
                        return Err(
                            DomainError::UnknownElementType(cmd.element_type_id.clone()).into(),
                        )
                    }
                }
                tree.with_added_node(&cmd.element_type_id, cmd.parent_id.as_ref())?;
                None
            }
        };

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.mutation = Some(ticket);
        inner.state.status = Status::Loading;
        self.publish(&inner.state);
        Ok(Some(PendingMutation {
            ticket,
            generation: inner.generation,
            chain_id: chain.id,
            local,
        }))
    }

    async fn dispatch(&self, command: &EditCommand) -> ApplicationResult<Option<Node>> {
        match command {
            EditCommand::Add(cmd) => self
                .gateway
                .create_node(&cmd.to_new_node())
                .await
                .map(Some)
                .map_err(|e| ApplicationError::remote(RemoteOperation::CreateNode, e)),
            EditCommand::Move(cmd) => self
                .gateway
                .move_node(&cmd.node_id, cmd.new_parent_id.as_ref())
                .await
                .map(|_| None)
                .map_err(|e| ApplicationError::remote(RemoteOperation::MoveNode, e)),
            EditCommand::Delete(cmd) => self
                .gateway
                .delete_node(&cmd.node_id)
                .await
                .map(|_| None)
                .map_err(|e| ApplicationError::remote(RemoteOperation::DeleteNode, e)),
        }
    }

    async fn settle(
        &self,
        pending: PendingMutation,
        result: ApplicationResult<Option<Node>>,
    ) -> ApplicationResult<ApplyOutcome> {
        let created = match result {
            Ok(created) => created,
            Err(err) => {
                warn!("remote mutation failed: {}", err);
                let mut inner = self.inner.lock();
                inner.mutation = None;
                if Self::is_current(&inner, &pending) {
                    inner.state.status = Status::Ready;
                    inner.state.error = Some(err.to_string());
                    self.publish(&inner.state);
                }
                return Err(err);
            }
        };
        let outcome = ApplyOutcome::Applied {
            created: created.as_ref().map(|n| n.id.clone()),
        };

        match self.mode {
            ReconcileMode::Reload => {
                let reloaded = self.fetch_snapshot(&pending.chain_id).await;
                let mut inner = self.inner.lock();
                inner.mutation = None;
                if !Self::is_current(&inner, &pending) {
                    return Ok(outcome);
                }
                inner.state.status = Status::Ready;
                match reloaded {
                    Ok((chain, element_types)) => {
                        inner.state.error = None;
                        inner.state.chain = Some(chain);
                        inner.state.element_types = Arc::new(element_types);
                        self.publish(&inner.state);
                        Ok(outcome)
                    }
                    Err(err) => {
                        // the remote store already changed, the held tree is stale
                        warn!("reload after mutation failed: {}", err);
                        inner.state.error = Some(err.to_string());
                        inner.state.chain = None;
                        inner.state.element_types = Arc::new(Vec::new());
                        self.publish(&inner.state);
                        Err(err)
                    }
                }
            }
            ReconcileMode::Patch => {
                let mut inner = self.inner.lock();
                inner.mutation = None;
                if !Self::is_current(&inner, &pending) {
                    return Ok(outcome);
                }
                inner.state.status = Status::Ready;
                let patched = match (pending.local, created) {
                    (Some(tree), _) => Ok(tree),
                    (None, Some(node)) => match inner.state.tree() {
                        Some(tree) => tree.with_inserted_node(node),
                        None => Err(DomainError::NotFound(node.id)),
                    },
                    (None, None) => {
                        self.publish(&inner.state);
                        return Ok(outcome);
                    }
                };
                match patched {
                    Ok(tree) => {
                        if let Some(chain) = inner.state.chain.as_mut() {
                            chain.tree = Arc::new(tree);
                        }
                        inner.state.error = None;
                        self.publish(&inner.state);
                        Ok(outcome)
                    }
                    Err(err) => {
                        warn!("cannot patch local tree: {}", err);
                        inner.state.error = Some(err.to_string());
                        self.publish(&inner.state);
                        Err(err.into())
                    }
                }
            }
        }
    }

    fn is_current(inner: &Inner, pending: &PendingMutation) -> bool {
        inner.generation == pending.generation
            && inner.state.chain_id() == Some(&pending.chain_id)
    }
}

/// Bookkeeping for a load or mutation whose future is being polled.
///
/// Dropping the future before it settles (a timeout, a `select!`) releases
/// the busy flag it holds and takes the status out of `Loading`.
struct InFlight<'a> {
    controller: &'a TreeController,
    work: Work,
}

#[derive(Debug, Clone, Copy)]
enum Work {
    Load { generation: u64 },
    Mutation { ticket: u64 },
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.controller.inner.lock();
        let released = match self.work {
            Work::Load { generation } if inner.loading && inner.generation == generation => {
                inner.loading = false;
                true
            }
            Work::Mutation { ticket } if inner.mutation == Some(ticket) => {
                inner.mutation = None;
                true
            }
            _ => false,
        };
        if !released {
            return;
        }

        warn!(work = ?self.work, "abandoned before settling");
        if !inner.loading && inner.mutation.is_none() && inner.state.status == Status::Loading {
            inner.state.status = if inner.state.chain.is_some() {
                Status::Ready
            } else {
                Status::Idle
            };
            self.controller.publish(&inner.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("reload", ReconcileMode::Reload)]
    #[case("Patch", ReconcileMode::Patch)]
    #[case(" patch ", ReconcileMode::Patch)]
    fn given_mode_name_when_parsing_then_matches(#[case] input: &str, #[case] expected: ReconcileMode) {
        assert_eq!(input.parse::<ReconcileMode>().unwrap(), expected);
    }

    #[test]
    fn given_unknown_mode_when_parsing_then_config_error() {
        let err = "optimistic".parse::<ReconcileMode>().unwrap_err();
        assert!(matches!(err, ApplicationError::Config { .. }));
    }

    #[test]
    fn given_mode_when_serializing_then_lowercase() {
        assert_eq!(ReconcileMode::Patch.to_string(), "patch");
        let json = serde_json::to_string(&ReconcileMode::Reload).unwrap();
        assert_eq!(json, r#""reload""#);
    }
}
