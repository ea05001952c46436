use std::process::Stdio;

use chrono::Utc;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::app::{ScanBackendError, ScanResultLookup, ScanTrigger, TrivyConfig};
use crate::domain::{image_identity::ImageIdentity, scanresult::scan_result::ScanResult};

use super::trivy_report::TrivyReport;

/// Every lookup runs a fresh scan. Triggering is a no-op.
#[derive(Clone, Debug)]
pub struct TrivyScanBackend {
    config: TrivyConfig,
}

#[derive(Error, Debug)]
pub(in crate::infra) enum TrivyScanBackendError {
    #[error("error executing the command: {0}")]
    CommandExecution(#[from] std::io::Error),

    #[error("error deserializing the report: {0}")]
    ReportDeserialization(#[from] serde_json::Error),

    #[error("trivy exited with status {status} scanning {image}: {stderr}")]
    ScanFailed {
        image: String,
        status: i32,
        stderr: String,
    },
}

impl From<TrivyScanBackendError> for ScanBackendError {
    fn from(value: TrivyScanBackendError) -> Self {
        ScanBackendError::InternalBackendError(Box::new(value))
    }
}

impl TrivyScanBackend {
    pub fn new(config: TrivyConfig) -> Self {
        Self { config }
    }

    fn args_for(&self, identity: &ImageIdentity) -> Vec<String> {
        let mut args = vec!["image".to_string()];
        args.extend(self.config.flags.iter().cloned());
        if let Some(server_url) = &self.config.server_url {
            args.push("--server".to_string());
            args.push(server_url.clone());
        }
        args.push(identity.reference().to_string());
        args
    }

    async fn scan(&self, identity: &ImageIdentity) -> Result<ScanResult, TrivyScanBackendError> {
        let args = self.args_for(identity);
        debug!("running {} {}", self.config.binary, args.join(" "));

        let output = Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(TrivyScanBackendError::ScanFailed {
                image: identity.reference().to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let report: TrivyReport = serde_json::from_slice(&output.stdout)?;
        Ok(report.into_scan_result(Utc::now()))
    }
}

#[async_trait::async_trait]
impl ScanResultLookup for TrivyScanBackend {
    async fn lookup(&self, identity: &ImageIdentity) -> Result<ScanResult, ScanBackendError> {
        Ok(self.scan(identity).await?)
    }
}

#[async_trait::async_trait]
impl ScanTrigger for TrivyScanBackend {
    async fn trigger(&self, identity: &ImageIdentity) -> Result<(), ScanBackendError> {
        debug!("trivy scans on lookup, nothing to trigger for {identity}");
        Ok(())
    }
}
