//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::ItemKind;

/// Chain tree editor: inspect a chain and apply validated structural edits
#[derive(Parser, Debug)]
#[command(name = "chaintree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Explicit config file (applied after the global one)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Backend API base URL (overrides config)
    #[arg(long, global = true, env = "CHAINTREE_API", value_hint = ValueHint::Url)]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a chain as a tree
    Show {
        /// Chain id
        chain: String,
    },

    /// List the element-type catalog
    Types,

    /// Add a node of an element type
    Add {
        /// Chain id
        chain: String,
        /// Element type id
        element_type: String,
        /// Parent node id (default: container root)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Move a node under another node
    Move {
        /// Chain id
        chain: String,
        /// Node id
        node: String,
        /// New parent node id (default: container root)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Delete a node and its subtree
    Delete {
        /// Chain id
        chain: String,
        /// Node id
        node: String,
    },

    /// Replay a drag-and-drop gesture
    Drop {
        /// Chain id
        chain: String,
        /// Id of the dragged item
        #[arg(long)]
        active: String,
        /// What is being dragged
        #[arg(long, value_enum, default_value_t = DragKind::Node)]
        kind: DragKind,
        /// Id of the drop zone (omit for a drop outside any zone)
        #[arg(long)]
        target: Option<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Kind of dragged item as given on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// An existing node
    Node,
    /// An element type from the palette
    Palette,
}

impl From<DragKind> for ItemKind {
    fn from(kind: DragKind) -> Self {
        match kind {
            DragKind::Node => ItemKind::Node,
            DragKind::Palette => ItemKind::PaletteItem,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}
