pub mod component_factory;
pub mod config;
mod scan_backend;
mod scan_orchestrator;

pub use config::{BackendConfig, BackendKind, Config, ConfigError, EcrConfig, TrivyConfig};
pub use scan_backend::{ScanBackend, ScanBackendError, ScanResultLookup, ScanTrigger};
pub use scan_orchestrator::{OrchestratorConfig, ScanError, ScanOrchestrator};
