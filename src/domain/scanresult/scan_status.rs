use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    NotFound,
    InProgress,
    Complete { completed_at: DateTime<Utc> },
    Failed,
}

impl ScanStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Complete { completed_at } => Some(*completed_at),
            _ => None,
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.completed_at()
            .is_some_and(|completed_at| now - completed_at < max_age)
    }
}
