use serde::Serialize;

use crate::domain::scanresult::findings::Findings;
use crate::domain::scanresult::scan_status::ScanStatus;

#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct ScanResult {
    #[serde(flatten)]
    status: ScanStatus,
    findings: Findings,
}

impl ScanResult {
    pub fn new(status: ScanStatus, findings: Findings) -> Self {
        Self { status, findings }
    }

    pub fn not_found() -> Self {
        Self::new(ScanStatus::NotFound, Findings::empty())
    }

    pub fn in_progress() -> Self {
        Self::new(ScanStatus::InProgress, Findings::empty())
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}
