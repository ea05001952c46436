use std::sync::Arc;

use thiserror::Error;

use crate::app::config::Config;
use crate::app::scan_backend::ScanBackend;
use crate::app::scan_orchestrator::ScanOrchestrator;

pub type SharedScanBackend = Arc<dyn ScanBackend + Send + Sync>;

pub struct Components {
    pub backend: SharedScanBackend,
}

impl Components {
    pub fn orchestrator(&self, config: &Config) -> ScanOrchestrator<dyn ScanBackend + Send + Sync> {
        ScanOrchestrator::new(self.backend.clone(), config.orchestrator.clone())
    }
}

#[derive(Error, Debug)]
pub enum ComponentFactoryError {
    #[error("the {0} backend is misconfigured: {1}")]
    InvalidBackendConfig(&'static str, String),
}

pub trait ComponentFactory {
    fn create_components(&self, config: &Config) -> Result<Components, ComponentFactoryError>;
}
