//! Tree builder for turning nested chain snapshots into an arena tree.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::domain::arena::TreeArena;
use crate::domain::entities::{NestedNode, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// Constructs a flat `TreeArena` from the nested root list of a snapshot.
pub struct TreeBuilder {
    visited: HashSet<NodeId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
        }
    }

    /// Build the tree from a list of root nodes carrying nested children.
    ///
    /// Nesting position is authoritative. A node that declares a parent id must
    /// declare the node it is nested under; roots must declare none. Duplicate
    /// ids and dangling parent references fail with `MalformedSnapshot` and no
    /// partial tree is returned.
    #[instrument(level = "debug", skip(self, roots), fields(roots = roots.len()))]
    pub fn build_from_snapshot(&mut self, roots: &[NestedNode]) -> DomainResult<TreeArena> {
        self.visited.clear();
        let mut tree = TreeArena::new();
        let mut stack: Vec<(&NestedNode, Option<&NodeId>)> =
            roots.iter().rev().map(|root| (root, None)).collect();

        while let Some((current, enclosing)) = stack.pop() {
            if !self.visited.insert(current.id.clone()) {
                return Err(DomainError::MalformedSnapshot(format!(
                    "duplicate node id {}",
                    current.id
                )));
            }
            Self::check_declared_parent(current, enclosing)?;

            let mut node = current.to_node();
            node.parent_id = enclosing.cloned();
            tree.insert(node)?;

            // Push children in reverse order so siblings keep their snapshot order
            for child in current.children.iter().rev() {
                stack.push((child, Some(&current.id)));
            }
        }

        debug!("built tree with {} nodes", tree.len());
        Ok(tree)
    }

    fn check_declared_parent(node: &NestedNode, enclosing: Option<&NodeId>) -> DomainResult<()> {
        match (&node.parent_id, enclosing) {
            (None, _) => Ok(()),
            (Some(declared), Some(actual)) if declared == actual => Ok(()),
            (Some(declared), Some(actual)) => Err(DomainError::MalformedSnapshot(format!(
                "node {} declares parent {} but is nested under {}",
                node.id, declared, actual
            ))),
            (Some(declared), None) => Err(DomainError::MalformedSnapshot(format!(
                "root node {} references missing parent {}",
                node.id, declared
            ))),
        }
    }
}
