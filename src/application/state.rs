//! Editor state published to observers.

use std::fmt;
use std::sync::Arc;

use crate::domain::{ChainId, ElementType, ElementTypeId, NestedNode, TreeArena};

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing loaded yet, or torn down
    #[default]
    Idle,
    /// A load or a mutation is outstanding
    Loading,
    Ready,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Loading => "loading",
            Status::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// The loaded chain together with its tree.
#[derive(Debug, Clone)]
pub struct ChainView {
    pub id: ChainId,
    pub name: String,
    pub tree: Arc<TreeArena>,
}

/// Snapshot handed to the rendering layer.
///
/// Cheap to clone: the tree and the catalog are shared. A published snapshot is
/// never mutated; every change publishes a fresh one.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub status: Status,
    /// Human-readable message of the last failure, cleared by the next success
    pub error: Option<String>,
    pub chain: Option<ChainView>,
    pub element_types: Arc<Vec<ElementType>>,
}

impl EditorState {
    pub fn is_ready(&self) -> bool {
        self.status == Status::Ready
    }

    pub fn chain_id(&self) -> Option<&ChainId> {
        self.chain.as_ref().map(|c| &c.id)
    }

    pub fn tree(&self) -> Option<&TreeArena> {
        self.chain.as_ref().map(|c| c.tree.as_ref())
    }

    pub fn element_type(&self, id: &ElementTypeId) -> Option<&ElementType> {
        self.element_types.iter().find(|et| &et.id == id)
    }

    /// Nested root list of the loaded tree, empty when nothing is loaded.
    pub fn nested(&self) -> Vec<NestedNode> {
        self.tree().map(TreeArena::to_nested).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_state_then_idle_and_empty() {
        let state = EditorState::default();
        assert_eq!(state.status, Status::Idle);
        assert!(state.error.is_none());
        assert!(state.chain_id().is_none());
        assert!(state.nested().is_empty());
        assert!(!state.is_ready());
    }

    #[test]
    fn given_catalog_when_looking_up_type_then_found_by_id() {
        let state = EditorState {
            element_types: Arc::new(vec![
                ElementType::new("pump", "Pump"),
                ElementType::new("valve", "Valve"),
            ]),
            ..Default::default()
        };
        assert_eq!(
            state.element_type(&ElementTypeId::from("valve")).map(|et| et.label.as_str()),
            Some("Valve")
        );
        assert!(state.element_type(&ElementTypeId::from("tank")).is_none());
    }
}
