use std::error::Error;

use thiserror::Error;

use crate::domain::{image_identity::ImageIdentity, scanresult::scan_result::ScanResult};

/// Reads what a backend currently knows about the scan of an image. Every call is a live query.
#[async_trait::async_trait]
pub trait ScanResultLookup {
    async fn lookup(&self, identity: &ImageIdentity) -> Result<ScanResult, ScanBackendError>;
}

/// Asks a backend to start scanning an image. Returns once the request is accepted, not when the
/// scan is done.
#[async_trait::async_trait]
pub trait ScanTrigger {
    async fn trigger(&self, identity: &ImageIdentity) -> Result<(), ScanBackendError>;
}

pub trait ScanBackend: ScanResultLookup + ScanTrigger {}

impl<T> ScanBackend for T where T: ScanResultLookup + ScanTrigger + ?Sized {}

#[derive(Error, Debug)]
pub enum ScanBackendError {
    #[error("error in the scan backend execution: {0}")]
    InternalBackendError(Box<dyn Error + Send + Sync>),
}
