//! Terminal output with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::domain::{ElementType, NodeId};

/// Red bold "error:" prefix on stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Yellow "Warning:" prefix on stderr
pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Plain output for data (rendered trees, TOML)
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}

/// Edit accepted by the remote store, with the id it assigned to a new node.
pub fn applied(description: &str, created: Option<&NodeId>) {
    match created {
        Some(id) => println!("{} {description}: created node {}", "✓".green(), id.to_string().bold()),
        None => println!("{} {description}", "✓".green()),
    }
}

/// Edit that would not change the tree.
pub fn unchanged(description: &str) {
    println!("{} {description}: nothing to change", "·".dimmed());
}

/// One catalog line; disabled types are dimmed.
pub fn element_type(et: &ElementType) {
    let line = format!("{:<10} {}", et.id, et.label);
    if et.enabled {
        println!("  {line}");
    } else {
        println!("  {}", format!("{line} (disabled)").dimmed());
    }
}

pub fn config_location(label: &str, path: &Path) {
    let state = if path.exists() {
        "exists".green()
    } else {
        "not found".yellow()
    };
    println!("{}: {} ({state})", label.green(), path.display());
}
