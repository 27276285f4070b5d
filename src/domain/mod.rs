//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod command;
pub mod display;
pub mod drag;
pub mod entities;
pub mod error;

pub use arena::{TreeArena, TreeNode};
pub use builder::TreeBuilder;
pub use command::{AddCommand, DeleteCommand, EditCommand, MoveCommand};
pub use display::TreeNodeConvert;
pub use drag::{ActiveItem, DragEnd, DragIntentResolver, DropTarget, ItemKind, TREE_CONTAINER_ID};
pub use entities::*;
pub use error::{DomainError, DomainResult, MoveRejection};
