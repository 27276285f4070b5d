//! Application services
//!
//! Concrete services that orchestrate domain logic. Services depend on
//! I/O boundary traits (RemoteGateway) but are themselves concrete structs.

mod controller;

pub use controller::{ApplyOutcome, ReconcileMode, TreeController};
