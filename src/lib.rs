//! chaintree: client-side state controller for a chain tree editor.
//!
//! Layers:
//! - `domain`: tree model, edit commands, drag intent resolution (pure)
//! - `application`: the tree controller and the state it publishes
//! - `infrastructure`: remote gateway trait, HTTP and in-memory gateways, DI
//! - `cli`: command line front end

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
