use std::process::{Output, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::app::{EcrConfig, ScanBackendError, ScanResultLookup, ScanTrigger};
use crate::domain::{image_identity::ImageIdentity, scanresult::scan_result::ScanResult};

use super::ecr_scan_findings::DescribeImageScanFindingsOutput;

const SCAN_NOT_FOUND: &str = "ScanNotFoundException";

#[derive(Clone, Debug)]
pub struct EcrScanBackend {
    config: EcrConfig,
}

#[derive(Error, Debug)]
pub(in crate::infra) enum EcrScanBackendError {
    #[error("error executing the command: {0}")]
    CommandExecution(#[from] std::io::Error),

    #[error("error deserializing the scan findings: {0}")]
    ReportDeserialization(#[from] serde_json::Error),

    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: &'static str,
        status: i32,
        stderr: String,
    },
}

impl From<EcrScanBackendError> for ScanBackendError {
    fn from(value: EcrScanBackendError) -> Self {
        ScanBackendError::InternalBackendError(Box::new(value))
    }
}

impl EcrScanBackend {
    pub fn new(config: EcrConfig) -> Self {
        Self { config }
    }

    fn args_for(&self, operation: &str, identity: &ImageIdentity) -> Vec<String> {
        let mut args = vec![
            "ecr".to_string(),
            operation.to_string(),
            "--repository-name".to_string(),
            identity.repository().to_string(),
            "--image-id".to_string(),
            format!("imageTag={}", identity.tag()),
            "--output".to_string(),
            "json".to_string(),
        ];

        let optional_args = [
            ("--registry-id", &self.config.registry_id),
            ("--region", &self.config.region),
            ("--profile", &self.config.profile),
        ];
        for (flag, value) in optional_args {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }

        args
    }

    async fn run(&self, args: Vec<String>) -> Result<Output, EcrScanBackendError> {
        debug!("running {} {}", self.config.binary, args.join(" "));

        Ok(Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?)
    }

    async fn describe_image_scan_findings(
        &self,
        identity: &ImageIdentity,
    ) -> Result<ScanResult, EcrScanBackendError> {
        let output = self
            .run(self.args_for("describe-image-scan-findings", identity))
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if stderr.contains(SCAN_NOT_FOUND) {
                return Ok(ScanResult::not_found());
            }
            return Err(EcrScanBackendError::CommandFailed {
                command: "describe-image-scan-findings",
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let report: DescribeImageScanFindingsOutput = serde_json::from_slice(&output.stdout)?;
        Ok(report.into())
    }

    async fn start_image_scan(&self, identity: &ImageIdentity) -> Result<(), EcrScanBackendError> {
        let output = self
            .run(self.args_for("start-image-scan", identity))
            .await?;

        if !output.status.success() {
            return Err(EcrScanBackendError::CommandFailed {
                command: "start-image-scan",
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ScanResultLookup for EcrScanBackend {
    async fn lookup(&self, identity: &ImageIdentity) -> Result<ScanResult, ScanBackendError> {
        Ok(self.describe_image_scan_findings(identity).await?)
    }
}

#[async_trait::async_trait]
impl ScanTrigger for EcrScanBackend {
    async fn trigger(&self, identity: &ImageIdentity) -> Result<(), ScanBackendError> {
        Ok(self.start_image_scan(identity).await?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::EcrScanBackend;
    use crate::app::{EcrConfig, ScanResultLookup, ScanTrigger};
    use crate::domain::{image_identity::ImageIdentity, scanresult::scan_status::ScanStatus};
    use crate::infra::test_support::fake_executable;
    use serial_test::serial;

    fn identity() -> ImageIdentity {
        ImageIdentity::parse(
            "245578940568.dkr.ecr.us-east-2.amazonaws.com/image-scan-poc-suvarna:terrascan",
        )
    }

    fn backend_running(script: &str) -> (tempfile::TempDir, EcrScanBackend) {
        let (dir, binary) = fake_executable("aws", script);
        let backend = EcrScanBackend::new(EcrConfig {
            binary: binary.display().to_string(),
            region: Some("us-east-2".to_string()),
            ..Default::default()
        });
        (dir, backend)
    }

    #[test]
    fn it_builds_the_describe_arguments() {
        let backend = EcrScanBackend::new(EcrConfig {
            registry_id: Some("245578940568".to_string()),
            region: Some("us-east-2".to_string()),
            ..Default::default()
        });

        assert_eq!(
            backend.args_for("describe-image-scan-findings", &identity()),
            vec![
                "ecr",
                "describe-image-scan-findings",
                "--repository-name",
                "image-scan-poc-suvarna",
                "--image-id",
                "imageTag=terrascan",
                "--output",
                "json",
                "--registry-id",
                "245578940568",
                "--region",
                "us-east-2",
            ]
        );
    }

    #[tokio::test]
    #[serial]
    async fn it_reports_a_missing_scan_as_not_found() {
        let (_dir, backend) = backend_running(
            r#"echo "An error occurred (ScanNotFoundException) when calling the DescribeImageScanFindings operation" >&2
exit 254"#,
        );

        let result = backend.lookup(&identity()).await.unwrap();

        assert_eq!(result.status(), &ScanStatus::NotFound);
    }

    #[tokio::test]
    #[serial]
    async fn it_fails_on_other_cli_errors() {
        let (_dir, backend) = backend_running(
            r#"echo "An error occurred (RepositoryNotFoundException)" >&2
exit 254"#,
        );

        let err = backend.lookup(&identity()).await.unwrap_err();

        assert!(err.to_string().contains("RepositoryNotFoundException"));
    }

    #[tokio::test]
    #[serial]
    async fn it_decodes_the_findings_printed_by_the_cli() {
        let (_dir, backend) = backend_running(
            r#"cat <<'JSON'
{"imageScanStatus": {"status": "IN_PROGRESS"}}
JSON"#,
        );

        let result = backend.lookup(&identity()).await.unwrap();

        assert_eq!(result.status(), &ScanStatus::InProgress);
    }

    #[tokio::test]
    #[serial]
    async fn it_triggers_a_scan_with_the_image_tag() {
        let (dir, backend) = backend_running(&format!(
            r#"echo "$@" > {}/args
echo '{{"imageScanStatus": {{"status": "IN_PROGRESS"}}}}'"#,
            "$(dirname \"$0\")"
        ));

        backend.trigger(&identity()).await.unwrap();

        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        assert!(args.starts_with("ecr start-image-scan --repository-name image-scan-poc-suvarna"));
        assert!(args.contains("--image-id imageTag=terrascan"));
    }

    #[tokio::test]
    #[serial]
    async fn a_rejected_trigger_is_a_backend_error() {
        let (_dir, backend) = backend_running(
            r#"echo "An error occurred (LimitExceededException)" >&2
exit 254"#,
        );

        let err = backend.trigger(&identity()).await.unwrap_err();

        assert!(err.to_string().contains("start-image-scan"));
    }
}
