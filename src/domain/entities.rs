//! Domain entities: identifiers, nodes, element types and chain snapshots

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire form of an identifier: the backend sends integer primary keys,
/// palette entries may use string slugs.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(u64),
    Str(String),
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        // Numeric ids go back out as numbers so the backend sees its own primary keys.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.0.parse::<u64>() {
                    Ok(n) => serializer.serialize_u64(n),
                    Err(_) => serializer.serialize_str(&self.0),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(match WireId::deserialize(deserializer)? {
                    WireId::Int(n) => Self(n.to_string()),
                    WireId::Str(s) => Self(s),
                })
            }
        }
    };
}

opaque_id!(
    /// Identifier of a node placed in a chain; stable for the node's lifetime.
    NodeId
);

opaque_id!(
    /// Identifier of an element-type catalog entry.
    ElementTypeId
);

opaque_id!(
    /// Identifier of the chain being edited.
    ChainId
);

impl NodeId {
    /// Temporary id for a node that the remote store has not confirmed yet.
    pub fn provisional() -> Self {
        Self(format!("tmp-{}", uuid::Uuid::new_v4()))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with("tmp-")
    }
}

/// A node of the chain hierarchy.
///
/// `parent_id` is authoritative; child lists are derived from it by the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(alias = "element_type")]
    pub element_type_id: ElementTypeId,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<NodeId>,
    /// Display name, not used by structural logic
    #[serde(default, alias = "nome", alias = "name")]
    pub label: String,
}

/// Catalog entry describing what kind of element a node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    pub id: ElementTypeId,
    #[serde(alias = "nome")]
    pub label: String,
    #[serde(default, alias = "descrizione")]
    pub description: String,
    /// Only enabled types may be placed into a chain
    #[serde(default = "enabled_by_default", alias = "is_enabled")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ElementType {
    pub fn new(id: impl Into<ElementTypeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            enabled: true,
        }
    }
}

/// Node as it appears in a nested snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedNode {
    pub id: NodeId,
    #[serde(alias = "element_type")]
    pub element_type_id: ElementTypeId,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<NodeId>,
    #[serde(default, alias = "nome", alias = "name")]
    pub label: String,
    #[serde(default)]
    pub children: Vec<NestedNode>,
}

impl NestedNode {
    pub fn new(id: impl Into<NodeId>, element_type_id: impl Into<ElementTypeId>) -> Self {
        Self {
            id: id.into(),
            element_type_id: element_type_id.into(),
            parent_id: None,
            label: String::new(),
            children: Vec::new(),
        }
    }

    /// Attach a child, setting its declared parent to this node.
    pub fn with_child(mut self, mut child: NestedNode) -> Self {
        child.parent_id = Some(self.id.clone());
        self.children.push(child);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn to_node(&self) -> Node {
        Node {
            id: self.id.clone(),
            element_type_id: self.element_type_id.clone(),
            parent_id: self.parent_id.clone(),
            label: self.label.clone(),
        }
    }
}

/// Full snapshot of a chain as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDetail {
    pub id: ChainId,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "nodes")]
    pub root_nodes: Vec<NestedNode>,
}

/// Request payload for creating a node remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub element_type_id: ElementTypeId,
    pub parent_id: Option<NodeId>,
    pub chain_id: ChainId,
}
