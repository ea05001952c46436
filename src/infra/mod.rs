mod component_factory_impl;
mod ecr_scan_backend;
mod ecr_scan_findings;
mod tfplan_loader;
mod trivy_report;
mod trivy_scan_backend;

#[cfg(all(test, unix))]
mod test_support;

pub use component_factory_impl::ConcreteComponentFactory;
pub use ecr_scan_backend::EcrScanBackend;
pub use tfplan_loader::{PlanLoadError, load_tfplan_file, parse_tfplan};
pub use trivy_scan_backend::TrivyScanBackend;
