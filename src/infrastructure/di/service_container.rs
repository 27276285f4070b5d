//! Service container for dependency injection
//!
//! Wires the controller to a gateway according to the settings.

use std::sync::Arc;

use crate::application::TreeController;
use crate::config::Settings;
use crate::domain::DragIntentResolver;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::http::HttpGateway;
use crate::infrastructure::traits::RemoteGateway;

/// Container holding the gateway and the controller built on it.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Remote store access
    pub gateway: Arc<dyn RemoteGateway>,

    /// Tree state controller
    pub controller: Arc<TreeController>,
}

impl ServiceContainer {
    /// Create a new service container talking HTTP to the configured backend.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let gateway = HttpGateway::from_settings(&settings)?;
        Ok(Self::with_deps(settings, Arc::new(gateway)))
    }

    /// Create a service container with a custom gateway (for testing).
    pub fn with_deps(settings: Settings, gateway: Arc<dyn RemoteGateway>) -> Self {
        let settings = Arc::new(settings);
        let controller = Arc::new(TreeController::with_options(
            Arc::clone(&gateway),
            settings.reconcile,
            DragIntentResolver::new(settings.container_id.clone()),
        ));

        Self {
            settings,
            gateway,
            controller,
        }
    }
}
