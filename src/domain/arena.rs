//! Arena-backed chain tree.
//!
//! Nodes live in a generational arena and are looked up by their remote id.
//! Parent pointers (`Node::parent_id`) are authoritative; child lists and the
//! root list are kept in agreement with them by every transform.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{ElementTypeId, NestedNode, Node, NodeId};
use crate::domain::error::{DomainError, DomainResult, MoveRejection};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Node data as known to the remote store
    pub node: Node,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, insertion ordered
    pub children: Vec<Index>,
}

/// Forest of chain nodes.
///
/// All `with_*` transforms are pure: they return a new tree and leave the
/// receiver untouched, so a published tree is never modified in place.
#[derive(Debug, Clone)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    index: HashMap<NodeId, Index>,
    roots: Vec<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            index: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.tree_node(id).map(|tn| &tn.node)
    }

    fn tree_node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.index.get(id).and_then(|&idx| self.arena.get(idx))
    }

    fn node_at(&self, idx: Index) -> Option<&Node> {
        self.arena.get(idx).map(|tn| &tn.node)
    }

    /// Parent of an existing node; `Ok(None)` for roots.
    pub fn parent_of(&self, id: &NodeId) -> DomainResult<Option<&NodeId>> {
        self.get(id)
            .map(|node| node.parent_id.as_ref())
            .ok_or_else(|| DomainError::NotFound(id.clone()))
    }

    pub fn roots_in_order(&self) -> Vec<&Node> {
        self.roots.iter().filter_map(|&idx| self.node_at(idx)).collect()
    }

    pub fn children_of(&self, id: &NodeId) -> DomainResult<Vec<&Node>> {
        let tn = self
            .tree_node(id)
            .ok_or_else(|| DomainError::NotFound(id.clone()))?;
        Ok(tn.children.iter().filter_map(|&idx| self.node_at(idx)).collect())
    }

    /// Ancestor ids of `id`, nearest first.
    ///
    /// The walk stops after `len()` steps so a corrupted tree cannot loop forever.
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent_id.as_ref());
        for _ in 0..self.len() {
            match current {
                Some(parent) => {
                    result.push(parent.clone());
                    current = self.get(parent).and_then(|n| n.parent_id.as_ref());
                }
                None => break,
            }
        }
        result
    }

    /// Whether `candidate_ancestor` lies on the ancestor chain of `node_id`.
    #[instrument(level = "trace", skip(self))]
    pub fn is_descendant(&self, candidate_ancestor: &NodeId, node_id: &NodeId) -> bool {
        let mut current = self.get(node_id).and_then(|n| n.parent_id.as_ref());
        for _ in 0..self.len() {
            match current {
                Some(parent) if parent == candidate_ancestor => return true,
                Some(parent) => current = self.get(parent).and_then(|n| n.parent_id.as_ref()),
                None => return false,
            }
        }
        false
    }

    /// Ids of `id` and everything below it, pre-order.
    pub fn subtree_ids(&self, id: &NodeId) -> DomainResult<Vec<NodeId>> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| DomainError::NotFound(id.clone()))?;
        Ok(self
            .subtree_indices(idx)
            .into_iter()
            .filter_map(|i| self.node_at(i).map(|n| n.id.clone()))
            .collect())
    }

    fn subtree_indices(&self, start: Index) -> Vec<Index> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if let Some(tn) = self.arena.get(idx) {
                result.push(idx);
                for &child in tn.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        result
    }

    /// Pre-order traversal over the whole forest.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Number of levels of the deepest branch; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth + 1).max().unwrap_or(0)
    }

    // ------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------

    /// New tree with `node_id` re-parented under `new_parent_id` (None = root).
    ///
    /// The node keeps its subtree and is appended to the end of its new sibling list.
    #[instrument(level = "debug", skip(self))]
    pub fn with_moved_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> DomainResult<TreeArena> {
        let reject = |reason| DomainError::InvalidMove {
            node_id: node_id.clone(),
            new_parent_id: new_parent_id.cloned(),
            reason,
        };

        if new_parent_id == Some(node_id) {
            return Err(reject(MoveRejection::OntoItself));
        }
        let idx = *self
            .index
            .get(node_id)
            .ok_or_else(|| reject(MoveRejection::MissingNode))?;
        let parent_idx = match new_parent_id {
            None => None,
            Some(parent) => {
                let pidx = *self
                    .index
                    .get(parent)
                    .ok_or_else(|| reject(MoveRejection::MissingParent))?;
                if self.is_descendant(node_id, parent) {
                    return Err(reject(MoveRejection::IntoOwnSubtree));
                }
                Some(pidx)
            }
        };

        let mut tree = self.clone();
        tree.detach(idx);
        tree.attach(idx, parent_idx);
        if let Some(tn) = tree.arena.get_mut(idx) {
            tn.node.parent_id = new_parent_id.cloned();
        }
        Ok(tree)
    }

    /// New tree plus the provisional node added under `parent_id`.
    ///
    /// The node carries a temporary id until the remote store assigns the real one.
    #[instrument(level = "debug", skip(self))]
    pub fn with_added_node(
        &self,
        element_type_id: &ElementTypeId,
        parent_id: Option<&NodeId>,
    ) -> DomainResult<(TreeArena, Node)> {
        if let Some(parent) = parent_id {
            if !self.contains(parent) {
                return Err(DomainError::InvalidParent(parent.clone()));
            }
        }
        let node = Node {
            id: NodeId::provisional(),
            element_type_id: element_type_id.clone(),
            parent_id: parent_id.cloned(),
            label: String::new(),
        };
        let mut tree = self.clone();
        tree.insert(node.clone())?;
        Ok((tree, node))
    }

    /// New tree with a node whose id was assigned by the remote store.
    pub fn with_inserted_node(&self, node: Node) -> DomainResult<TreeArena> {
        let mut tree = self.clone();
        tree.insert(node)?;
        Ok(tree)
    }

    /// New tree without `node_id` and its whole subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn with_removed_node(&self, node_id: &NodeId) -> DomainResult<TreeArena> {
        let idx = *self
            .index
            .get(node_id)
            .ok_or_else(|| DomainError::NotFound(node_id.clone()))?;
        let doomed = self.subtree_indices(idx);

        let mut tree = self.clone();
        tree.detach(idx);
        for i in doomed {
            if let Some(tn) = tree.arena.remove(i) {
                tree.index.remove(&tn.node.id);
            }
        }
        Ok(tree)
    }

    /// Insert a node below an existing parent (or as a root).
    pub(crate) fn insert(&mut self, node: Node) -> DomainResult<Index> {
        if self.index.contains_key(&node.id) {
            return Err(DomainError::MalformedSnapshot(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        let parent = match &node.parent_id {
            None => None,
            Some(parent_id) => Some(
                *self
                    .index
                    .get(parent_id)
                    .ok_or_else(|| DomainError::InvalidParent(parent_id.clone()))?,
            ),
        };
        let id = node.id.clone();
        let idx = self.arena.insert(TreeNode {
            node,
            parent: None,
            children: Vec::new(),
        });
        self.index.insert(id, idx);
        self.attach(idx, parent);
        Ok(idx)
    }

    fn attach(&mut self, idx: Index, parent: Option<Index>) {
        if let Some(tn) = self.arena.get_mut(idx) {
            tn.parent = parent;
        }
        match parent {
            Some(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx) {
                    parent.children.push(idx);
                }
            }
            None => self.roots.push(idx),
        }
    }

    fn detach(&mut self, idx: Index) {
        let parent = self.arena.get(idx).and_then(|tn| tn.parent);
        match parent {
            Some(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx) {
                    parent.children.retain(|&c| c != idx);
                }
            }
            None => self.roots.retain(|&r| r != idx),
        }
    }

    // ------------------------------------------------------------
    // Invariants and export
    // ------------------------------------------------------------

    /// Verify acyclicity, referential integrity and link agreement.
    pub fn check_invariants(&self) -> DomainResult<()> {
        for (idx, tn) in self.arena.iter() {
            let id = &tn.node.id;
            let expected_parent = match &tn.node.parent_id {
                None => None,
                Some(parent_id) => Some(*self.index.get(parent_id).ok_or_else(|| {
                    DomainError::MalformedSnapshot(format!(
                        "node {} references missing parent {}",
                        id, parent_id
                    ))
                })?),
            };
            if tn.parent != expected_parent {
                return Err(DomainError::MalformedSnapshot(format!(
                    "node {} parent link disagrees with parent id",
                    id
                )));
            }
            let listed = match expected_parent {
                Some(p) => self
                    .arena
                    .get(p)
                    .map(|parent| parent.children.iter().filter(|&&c| c == idx).count())
                    .unwrap_or(0),
                None => self.roots.iter().filter(|&&r| r == idx).count(),
            };
            if listed != 1 {
                return Err(DomainError::MalformedSnapshot(format!(
                    "node {} listed {} times under its parent",
                    id, listed
                )));
            }
            let ancestors = self.ancestors(id);
            if ancestors.contains(id) || ancestors.len() >= self.len() {
                return Err(DomainError::MalformedSnapshot(format!(
                    "cycle detected at node {}",
                    id
                )));
            }
        }
        if self.index.len() != self.arena.len() {
            return Err(DomainError::MalformedSnapshot(
                "id index out of sync with arena".to_string(),
            ));
        }
        Ok(())
    }

    /// Export as the nested root list consumed by the rendering layer.
    pub fn to_nested(&self) -> Vec<NestedNode> {
        let mut roots = Vec::with_capacity(self.roots.len());
        // node under construction plus the children still to visit
        let mut stack: Vec<(NestedNode, std::slice::Iter<'_, Index>)> = Vec::new();

        for &root in &self.roots {
            let Some(tn) = self.arena.get(root) else {
                continue;
            };
            stack.push((Self::shallow(tn), tn.children.iter()));

            while let Some((_, pending)) = stack.last_mut() {
                match pending.next() {
                    Some(&child) => {
                        if let Some(child_tn) = self.arena.get(child) {
                            stack.push((Self::shallow(child_tn), child_tn.children.iter()));
                        }
                    }
                    None => {
                        let Some((done, _)) = stack.pop() else {
                            break;
                        };
                        match stack.last_mut() {
                            Some((parent, _)) => parent.children.push(done),
                            None => roots.push(done),
                        }
                    }
                }
            }
        }
        roots
    }

    fn shallow(tn: &TreeNode) -> NestedNode {
        NestedNode {
            id: tn.node.id.clone(),
            element_type_id: tn.node.element_type_id.clone(),
            parent_id: tn.node.parent_id.clone(),
            label: tn.node.label.clone(),
            children: Vec::new(),
        }
    }
}

/// Pre-order iterator yielding `(depth, node)` pairs, roots at depth 0.
pub struct TreeIterator<'a> {
    tree: &'a TreeArena,
    stack: Vec<(usize, Index)>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a TreeArena) -> Self {
        let stack = tree.roots.iter().rev().map(|&idx| (0, idx)).collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, idx)) = self.stack.pop() {
            if let Some(tn) = self.tree.arena.get(idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in tn.children.iter().rev() {
                    self.stack.push((depth + 1, child));
                }
                return Some((depth, &tn.node));
            }
        }
        None
    }
}
