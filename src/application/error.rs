//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{ChainId, DomainError};
use crate::infrastructure::traits::{GatewayError, RemoteOperation};

/// Application errors wrap domain errors and add controller-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("another operation is in flight, retry when it settles")]
    Busy,

    #[error("no chain loaded")]
    NotLoaded,

    #[error("load of chain {chain_id} was superseded by a newer request")]
    Superseded { chain_id: ChainId },

    #[error("failed to load chain {chain_id}: {source}")]
    LoadFailed {
        chain_id: ChainId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation} failed: {source}")]
    RemoteOperationFailed {
        operation: RemoteOperation,
        #[source]
        source: GatewayError,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn remote(operation: RemoteOperation, source: GatewayError) -> Self {
        Self::RemoteOperationFailed { operation, source }
    }

    pub fn load_failed(
        chain_id: &ChainId,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::LoadFailed {
            chain_id: chain_id.clone(),
            source: source.into(),
        }
    }

    /// Rejections decided locally, before any remote call.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Domain(_) | Self::Busy | Self::NotLoaded)
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
