use std::sync::Arc;

use tracing::debug;

use crate::app::{
    BackendKind, Config,
    component_factory::{ComponentFactory, ComponentFactoryError, Components, SharedScanBackend},
};
use crate::infra::{EcrScanBackend, TrivyScanBackend};

pub struct ConcreteComponentFactory;

impl ComponentFactory for ConcreteComponentFactory {
    fn create_components(&self, config: &Config) -> Result<Components, ComponentFactoryError> {
        let backend = &config.backend;
        debug!("creating {:?} scan backend", backend.kind);

        let backend: SharedScanBackend = match backend.kind {
            BackendKind::Ecr => {
                if backend.ecr.binary.trim().is_empty() {
                    return Err(ComponentFactoryError::InvalidBackendConfig(
                        "ecr",
                        "the aws binary cannot be empty".to_string(),
                    ));
                }
                Arc::new(EcrScanBackend::new(backend.ecr.clone()))
            }
            BackendKind::Trivy => {
                if backend.trivy.binary.trim().is_empty() {
                    return Err(ComponentFactoryError::InvalidBackendConfig(
                        "trivy",
                        "the trivy binary cannot be empty".to_string(),
                    ));
                }
                Arc::new(TrivyScanBackend::new(backend.trivy.clone()))
            }
        };

        Ok(Components { backend })
    }
}
