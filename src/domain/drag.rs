//! Drag-and-drop intent model.
//!
//! Turns a drag-end event from the rendering layer into a structural edit.
//! Pure data, no I/O, so it can be tested without any UI.

use crate::domain::command::{AddCommand, EditCommand, MoveCommand};
use crate::domain::entities::{ChainId, ElementTypeId, NodeId};

/// Id of the drop zone that stands for the tree container itself.
pub const TREE_CONTAINER_ID: &str = "chain-tree-container";

/// What is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// An existing node of the tree
    Node,
    /// An element type picked from the palette
    PaletteItem,
}

/// The dragged item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveItem {
    pub id: String,
    pub kind: ItemKind,
}

impl ActiveItem {
    pub fn node(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Node,
        }
    }

    pub fn palette(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::PaletteItem,
        }
    }
}

/// Drop zone under the pointer when the drag ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub id: String,
}

impl DropTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A finished drag gesture; `over` is None when dropped outside any zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub active: ActiveItem,
    pub over: Option<DropTarget>,
}

/// Classifies drag-end events into edit commands.
#[derive(Debug, Clone)]
pub struct DragIntentResolver {
    container_id: String,
}

impl Default for DragIntentResolver {
    fn default() -> Self {
        Self::new(TREE_CONTAINER_ID)
    }
}

impl DragIntentResolver {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Map the event to a command, or None when nothing should happen.
    pub fn resolve(&self, event: &DragEnd, chain_id: &ChainId) -> Option<EditCommand> {
        let target = event.over.as_ref()?;
        let parent = self.parent_for(target);

        match event.active.kind {
            ItemKind::Node if event.active.id == target.id => None,
            ItemKind::Node => Some(EditCommand::Move(MoveCommand {
                node_id: NodeId::from(event.active.id.as_str()),
                new_parent_id: parent,
            })),
            ItemKind::PaletteItem => Some(EditCommand::Add(AddCommand {
                element_type_id: ElementTypeId::from(event.active.id.as_str()),
                parent_id: parent,
                chain_id: chain_id.clone(),
            })),
        }
    }

    fn parent_for(&self, target: &DropTarget) -> Option<NodeId> {
        if target.id == self.container_id {
            None
        } else {
            Some(NodeId::from(target.id.as_str()))
        }
    }
}
