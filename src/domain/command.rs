//! Structural edit commands.

use std::fmt;

use crate::domain::entities::{ChainId, ElementTypeId, NewNode, NodeId};

/// Place a new node of a catalog type into the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCommand {
    pub element_type_id: ElementTypeId,
    pub parent_id: Option<NodeId>,
    pub chain_id: ChainId,
}

impl AddCommand {
    pub fn to_new_node(&self) -> NewNode {
        NewNode {
            element_type_id: self.element_type_id.clone(),
            parent_id: self.parent_id.clone(),
            chain_id: self.chain_id.clone(),
        }
    }
}

/// Re-parent an existing node; `None` moves it to the container root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCommand {
    pub node_id: NodeId,
    pub new_parent_id: Option<NodeId>,
}

/// Remove a node and its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCommand {
    pub node_id: NodeId,
}

/// Closed set of edits the controller accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Add(AddCommand),
    Move(MoveCommand),
    Delete(DeleteCommand),
}

impl From<AddCommand> for EditCommand {
    fn from(cmd: AddCommand) -> Self {
        EditCommand::Add(cmd)
    }
}

impl From<MoveCommand> for EditCommand {
    fn from(cmd: MoveCommand) -> Self {
        EditCommand::Move(cmd)
    }
}

impl From<DeleteCommand> for EditCommand {
    fn from(cmd: DeleteCommand) -> Self {
        EditCommand::Delete(cmd)
    }
}

fn parent_or_root(parent: &Option<NodeId>) -> String {
    parent
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "root".to_string())
}

impl fmt::Display for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditCommand::Add(c) => write!(
                f,
                "add {} under {} in chain {}",
                c.element_type_id,
                parent_or_root(&c.parent_id),
                c.chain_id
            ),
            EditCommand::Move(c) => write!(
                f,
                "move {} under {}",
                c.node_id,
                parent_or_root(&c.new_parent_id)
            ),
            EditCommand::Delete(c) => write!(f, "delete {}", c.node_id),
        }
    }
}
