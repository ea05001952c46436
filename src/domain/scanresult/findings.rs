use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::domain::scanresult::severity::Severity;
use crate::domain::scanresult::vulnerability::Vulnerability;

#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize)]
pub struct Findings {
    vulnerabilities: Vec<Vulnerability>,
    description: Option<String>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub negligible: usize,
    pub unknown: usize,
}

impl Findings {
    pub fn new(vulnerabilities: Vec<Vulnerability>, description: Option<String>) -> Self {
        Self {
            vulnerabilities,
            description,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        &self.vulnerabilities
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let counts: HashMap<Severity, usize> =
            self.vulnerabilities.iter().counts_by(|v| v.severity());
        let count_of = |severity| counts.get(&severity).copied().unwrap_or_default();

        SeverityCounts {
            critical: count_of(Severity::Critical),
            high: count_of(Severity::High),
            medium: count_of(Severity::Medium),
            low: count_of(Severity::Low),
            negligible: count_of(Severity::Negligible),
            unknown: count_of(Severity::Unknown),
        }
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.vulnerabilities.iter().map(|v| v.severity()).min()
    }
}

#[cfg(test)]
mod tests {
    use super::Findings;
    use crate::domain::scanresult::severity::Severity;
    use crate::domain::scanresult::vulnerability::Vulnerability;

    fn a_vulnerability(id: &str, severity: Severity) -> Vulnerability {
        Vulnerability::new(id.to_string(), severity, None, None, None, None)
    }

    #[test]
    fn it_counts_vulnerabilities_by_severity() {
        let findings = Findings::new(
            vec![
                a_vulnerability("CVE-1", Severity::Critical),
                a_vulnerability("CVE-2", Severity::High),
                a_vulnerability("CVE-3", Severity::High),
                a_vulnerability("CVE-4", Severity::Low),
                a_vulnerability("CVE-5", Severity::Unknown),
            ],
            None,
        );

        let counts = findings.severity_counts();

        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.medium, 0);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.negligible, 0);
        assert_eq!(counts.unknown, 1);
    }

    #[test]
    fn the_highest_severity_is_the_most_critical_one() {
        let findings = Findings::new(
            vec![
                a_vulnerability("CVE-1", Severity::Low),
                a_vulnerability("CVE-2", Severity::High),
            ],
            None,
        );

        assert_eq!(findings.highest_severity(), Some(Severity::High));
        assert_eq!(Findings::empty().highest_severity(), None);
    }
}
