use serde::Serialize;

use crate::domain::scanresult::severity::Severity;

#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct Vulnerability {
    id: String,
    severity: Severity,
    package_name: Option<String>,
    installed_version: Option<String>,
    fixed_version: Option<String>,
    uri: Option<String>,
}

impl Vulnerability {
    pub fn new(
        id: String,
        severity: Severity,
        package_name: Option<String>,
        installed_version: Option<String>,
        fixed_version: Option<String>,
        uri: Option<String>,
    ) -> Self {
        Self {
            id,
            severity,
            package_name,
            installed_version,
            fixed_version,
            uri,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    pub fn installed_version(&self) -> Option<&str> {
        self.installed_version.as_deref()
    }

    pub fn fixed_version(&self) -> Option<&str> {
        self.fixed_version.as_deref()
    }

    pub fn is_fixable(&self) -> bool {
        self.fixed_version.as_deref().is_some_and(|v| !v.is_empty())
    }
}
