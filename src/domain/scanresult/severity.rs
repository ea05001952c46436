use std::fmt::{Display, Formatter};

use serde::Serialize;

#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Debug, Serialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Negligible,
    Unknown,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Severity::Critical => "Critical",
                Severity::High => "High",
                Severity::Medium => "Medium",
                Severity::Low => "Low",
                Severity::Negligible => "Negligible",
                Severity::Unknown => "Unknown",
            }
        )
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            "NEGLIGIBLE" | "INFORMATIONAL" => Severity::Negligible,
            _ => Severity::Unknown,
        }
    }
}
