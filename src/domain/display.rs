/*
Tree rendering via termtree, shared by the arena and nested snapshots.
 */
use termtree::Tree;

use crate::domain::arena::TreeArena;
use crate::domain::entities::{NestedNode, Node};

pub trait TreeNodeConvert {
    fn to_tree_string(&self, title: &str) -> Tree<String>;
}

fn node_line(node: &Node) -> String {
    if node.label.is_empty() {
        format!("{} [{}]", node.element_type_id, node.id)
    } else {
        format!("{} [{}] <{}>", node.label, node.id, node.element_type_id)
    }
}

impl TreeNodeConvert for [NestedNode] {
    fn to_tree_string(&self, title: &str) -> Tree<String> {
        let mut top = Tree::new(title.to_string());
        let mut stack: Vec<(Tree<String>, std::slice::Iter<'_, NestedNode>)> = Vec::new();

        for root in self {
            stack.push((Tree::new(node_line(&root.to_node())), root.children.iter()));
            while let Some((_, pending)) = stack.last_mut() {
                match pending.next() {
                    Some(child) => {
                        stack.push((Tree::new(node_line(&child.to_node())), child.children.iter()));
                    }
                    None => {
                        let Some((done, _)) = stack.pop() else {
                            break;
                        };
                        match stack.last_mut() {
                            Some((parent, _)) => {
                                parent.push(done);
                            }
                            None => {
                                top.push(done);
                            }
                        }
                    }
                }
            }
        }
        top
    }
}

impl TreeNodeConvert for TreeArena {
    fn to_tree_string(&self, title: &str) -> Tree<String> {
        if self.is_empty() {
            return Tree::new(format!("{title} (empty)"));
        }
        self.to_nested().as_slice().to_tree_string(title)
    }
}
