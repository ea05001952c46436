#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use iac_image_scan::app::{
    OrchestratorConfig, ScanBackendError, ScanOrchestrator, ScanResultLookup, ScanTrigger,
};
use iac_image_scan::domain::{
    image_identity::ImageIdentity,
    scanresult::{findings::Findings, scan_result::ScanResult, scan_status::ScanStatus},
};
use mockall::mock;

mock! {
    pub ScanBackend {}

    #[async_trait::async_trait]
    impl ScanResultLookup for ScanBackend {
        async fn lookup(&self, identity: &ImageIdentity) -> Result<ScanResult, ScanBackendError>;
    }

    #[async_trait::async_trait]
    impl ScanTrigger for ScanBackend {
        async fn trigger(&self, identity: &ImageIdentity) -> Result<(), ScanBackendError>;
    }
}

pub const ECR_IMAGE: &str =
    "245578940568.dkr.ecr.us-east-2.amazonaws.com/image-scan-poc-suvarna:terrascan";

pub fn ecr_identity() -> ImageIdentity {
    ImageIdentity::parse(ECR_IMAGE)
}

/// Polls fast enough for tests and gives up after `max_attempts` lookups.
pub fn fast_polling(max_attempts: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval: Duration::from_millis(1),
        max_poll_interval: Duration::from_millis(2),
        max_attempts,
        timeout: Duration::from_secs(10),
        ..Default::default()
    }
}

pub fn orchestrator_for(
    backend: MockScanBackend,
    config: OrchestratorConfig,
) -> ScanOrchestrator<MockScanBackend> {
    ScanOrchestrator::new(Arc::new(backend), config)
}

pub fn completed_hours_ago(hours: i64) -> ScanResult {
    ScanResult::new(
        ScanStatus::Complete {
            completed_at: Utc::now() - chrono::Duration::hours(hours),
        },
        Findings::empty(),
    )
}

pub fn failed_scan() -> ScanResult {
    ScanResult::new(
        ScanStatus::Failed,
        Findings::new(vec![], Some("UnsupportedImageError".to_string())),
    )
}

pub fn backend_error(message: &str) -> ScanBackendError {
    ScanBackendError::InternalBackendError(message.to_string().into())
}

#[cfg(unix)]
#[path = "../src/infra/test_support.rs"]
mod test_support;

#[cfg(unix)]
pub use test_support::fake_executable;
