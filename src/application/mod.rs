//! Application layer: controller and editor state
//!
//! This layer orchestrates domain logic and depends on the remote gateway trait.

pub mod error;
pub mod services;
pub mod state;

pub use error::{ApplicationError, ApplicationResult};
pub use services::{ApplyOutcome, ReconcileMode, TreeController};
pub use state::{ChainView, EditorState, Status};
