use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::scanresult::{
    findings::Findings, scan_result::ScanResult, scan_status::ScanStatus, severity::Severity,
    vulnerability::Vulnerability,
};

const FIX_NOT_AVAILABLE: &str = "NotAvailable";

/// Output of `aws ecr describe-image-scan-findings --output json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DescribeImageScanFindingsOutput {
    pub image_scan_status: Option<ImageScanStatus>,
    pub image_scan_findings: Option<ImageScanFindings>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageScanStatus {
    pub status: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImageScanFindings {
    #[serde(default, deserialize_with = "deserialize_aws_timestamp")]
    pub image_scan_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub findings: Vec<BasicFinding>,
    #[serde(default)]
    pub enhanced_findings: Vec<EnhancedFinding>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BasicFinding {
    pub name: String,
    pub uri: Option<String>,
    pub severity: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EnhancedFinding {
    pub severity: Option<String>,
    pub package_vulnerability_details: Option<PackageVulnerabilityDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PackageVulnerabilityDetails {
    pub vulnerability_id: String,
    pub source_url: Option<String>,
    #[serde(default)]
    pub vulnerable_packages: Vec<VulnerablePackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VulnerablePackage {
    pub name: String,
    pub version: Option<String>,
    pub fixed_in_version: Option<String>,
}

impl From<DescribeImageScanFindingsOutput> for ScanResult {
    fn from(output: DescribeImageScanFindingsOutput) -> Self {
        let (status, description) = output
            .image_scan_status
            .map(|s| (s.status.unwrap_or_default(), s.description))
            .unwrap_or_default();
        let completed_at = output
            .image_scan_findings
            .as_ref()
            .and_then(|f| f.image_scan_completed_at);

        let status = scan_status_for(&status, completed_at);
        let vulnerabilities = output
            .image_scan_findings
            .map(vulnerabilities_for)
            .unwrap_or_default();

        ScanResult::new(status, Findings::new(vulnerabilities, description))
    }
}

fn scan_status_for(status: &str, completed_at: Option<DateTime<Utc>>) -> ScanStatus {
    match (status.to_ascii_uppercase().as_str(), completed_at) {
        ("COMPLETE" | "ACTIVE", Some(completed_at)) => ScanStatus::Complete { completed_at },
        // A completed scan without timestamp has not been published yet.
        ("COMPLETE" | "ACTIVE" | "IN_PROGRESS" | "PENDING", _) => ScanStatus::InProgress,
        _ => ScanStatus::Failed,
    }
}

fn vulnerabilities_for(findings: ImageScanFindings) -> Vec<Vulnerability> {
    let basic = findings.findings.into_iter().map(|finding| {
        let attribute = |key: &str| {
            finding
                .attributes
                .iter()
                .find(|a| a.key == key)
                .and_then(|a| a.value.clone())
        };

        Vulnerability::new(
            finding.name.clone(),
            finding.severity.as_deref().unwrap_or_default().into(),
            attribute("package_name"),
            attribute("package_version"),
            None,
            finding.uri.clone(),
        )
    });

    let enhanced = findings
        .enhanced_findings
        .into_iter()
        .filter_map(|finding| {
            let severity = Severity::from(finding.severity.as_deref().unwrap_or_default());
            let details = finding.package_vulnerability_details?;
            let package = details.vulnerable_packages.into_iter().next();

            Some(Vulnerability::new(
                details.vulnerability_id,
                severity,
                package.as_ref().map(|p| p.name.clone()),
                package.as_ref().and_then(|p| p.version.clone()),
                package
                    .and_then(|p| p.fixed_in_version)
                    .filter(|v| v != FIX_NOT_AVAILABLE),
                details.source_url,
            ))
        });

    basic.chain(enhanced).collect()
}

/// The AWS CLI prints timestamps either as ISO 8601 or as epoch seconds depending on
/// `cli_timestamp_format`.
fn deserialize_aws_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AwsTimestamp {
        Iso8601(DateTime<Utc>),
        EpochSeconds(f64),
    }

    match Option::<AwsTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AwsTimestamp::Iso8601(timestamp)) => Ok(Some(timestamp)),
        Some(AwsTimestamp::EpochSeconds(seconds)) => {
            let millis = (seconds * 1000.0).round() as i64;
            DateTime::from_timestamp_millis(millis)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {seconds}")))
        }
    }
}
