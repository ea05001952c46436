use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::scanresult::{
    findings::Findings, scan_result::ScanResult, scan_status::ScanStatus, severity::Severity,
    vulnerability::Vulnerability,
};

/// JSON document printed by `trivy image -f json`. Trivy before schema v2 printed the bare list
/// of results instead of an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum TrivyReport {
    Versioned(VersionedReport),
    Legacy(Vec<TrivyResult>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct VersionedReport {
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Option<Vec<TrivyResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct TrivyResult {
    #[serde(default)]
    pub vulnerabilities: Option<Vec<TrivyVulnerability>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID")]
    pub vulnerability_id: String,
    pub pkg_name: Option<String>,
    pub installed_version: Option<String>,
    pub fixed_version: Option<String>,
    pub severity: Option<String>,
    #[serde(rename = "PrimaryURL")]
    pub primary_url: Option<String>,
}

impl TrivyReport {
    pub fn into_scan_result(self, scanned_at: DateTime<Utc>) -> ScanResult {
        let (created_at, results) = match self {
            TrivyReport::Versioned(report) => (report.created_at, report.results.unwrap_or_default()),
            TrivyReport::Legacy(results) => (None, results),
        };

        let vulnerabilities = results
            .into_iter()
            .flat_map(|result| result.vulnerabilities.unwrap_or_default())
            .map(|v| {
                Vulnerability::new(
                    v.vulnerability_id,
                    Severity::from(v.severity.as_deref().unwrap_or_default()),
                    v.pkg_name,
                    v.installed_version,
                    v.fixed_version.filter(|fix| !fix.is_empty()),
                    v.primary_url,
                )
            })
            .collect();

        ScanResult::new(
            ScanStatus::Complete {
                completed_at: created_at.unwrap_or(scanned_at),
            },
            Findings::new(vulnerabilities, None),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::TrivyReport;
    use crate::domain::scanresult::severity::Severity;

    #[test]
    fn it_loads_a_versioned_report() {
        let report: TrivyReport = serde_json::from_slice(include_bytes!(
            "../../tests/fixtures/scan-results/trivy_report.json"
        ))
        .unwrap();

        let scan_result = report.into_scan_result(Utc::now());

        assert_eq!(
            scan_result.status().completed_at(),
            Some(
                "2024-03-11T10:02:33.123456789Z"
                    .parse::<DateTime<Utc>>()
                    .unwrap()
            )
        );

        let findings = scan_result.findings();
        assert_eq!(findings.vulnerabilities().len(), 3);
        assert_eq!(findings.highest_severity(), Some(Severity::Critical));

        let counts = findings.severity_counts();
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.low, 1);

        let apt = findings
            .vulnerabilities()
            .iter()
            .find(|v| v.id() == "CVE-2011-3374")
            .unwrap();
        assert_eq!(apt.package_name(), Some("apt"));
        assert!(!apt.is_fixable());
    }

    #[test]
    fn it_loads_a_legacy_report() {
        let report: TrivyReport = serde_json::from_slice(include_bytes!(
            "../../tests/fixtures/scan-results/trivy_report_legacy.json"
        ))
        .unwrap();
        let scanned_at = Utc::now();

        let scan_result = report.into_scan_result(scanned_at);

        assert_eq!(scan_result.status().completed_at(), Some(scanned_at));
        let vulnerabilities = scan_result.findings().vulnerabilities();
        assert_eq!(vulnerabilities.len(), 2);
        assert_eq!(vulnerabilities[0].fixed_version(), Some("2.10.7-r0"));
        assert_eq!(vulnerabilities[1].severity(), Severity::Unknown);
    }

    #[test]
    fn an_image_without_vulnerabilities_is_a_clean_complete_scan() {
        let report: TrivyReport =
            serde_json::from_str(r#"{"SchemaVersion": 2, "Results": [{"Target": "alpine"}]}"#)
                .unwrap();

        let scan_result = report.into_scan_result(Utc::now());

        assert!(scan_result.status().is_complete());
        assert!(scan_result.findings().is_empty());
    }
}
