//! Infrastructure layer: gateway implementations and DI container
//!
//! This layer implements the remote gateway trait and wires up services.

pub mod di;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::{InfraError, InfraResult};
pub use http::HttpGateway;
pub use memory::{GatewayCall, InMemoryGateway};
pub use traits::{GatewayError, GatewayResult, RemoteGateway, RemoteOperation};
