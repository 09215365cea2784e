use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tabled::Tabled;

use crate::scan::ScanError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl Display for PodPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ContainerStatus {
    pub name: String,
    pub ready: bool,
    pub restart_count: u32,
    pub waiting_reason: Option<String>,
    pub terminated_reason: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub phase: PodPhase,
    /// Declared container names, in pod spec order.
    pub containers: Vec<String>,
    pub container_statuses: Vec<ContainerStatus>,
}

impl PodRecord {
    pub fn status_for(&self, container: &str) -> Option<&ContainerStatus> {
        self.container_statuses
            .iter()
            .find(|status| status.name == container)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Tabled)]
pub struct AggregatedRow {
    #[tabled(rename = "NAMESPACE")]
    pub namespace: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "READY")]
    pub ready: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "RESTARTS")]
    pub restarts: u32,
    #[tabled(rename = "AGE")]
    pub age: String,
    #[tabled(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first namespace whose pods cannot be listed
    #[default]
    Abort,
    /// Keep scanning and report failed namespaces at the end
    Continue,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AgeFormat {
    /// Full duration, for example 3h2m10s
    #[default]
    Precise,
    /// Largest unit only, for example 3h
    Compact,
}

impl AgeFormat {
    pub fn render(self, seconds: u64) -> String {
        match self {
            Self::Precise => format_duration_seconds(seconds),
            Self::Compact => format_elapsed_seconds(seconds),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceScan {
    pub namespace: String,
    pub rows: Vec<AggregatedRow>,
    pub missing_statuses: usize,
}

#[derive(Debug)]
pub struct ScanReport {
    pub scanned_at: DateTime<Utc>,
    pub rows: Vec<AggregatedRow>,
    pub failures: Vec<ScanError>,
    pub missing_statuses: usize,
}

impl ScanReport {
    pub fn new(scanned_at: DateTime<Utc>) -> Self {
        Self {
            scanned_at,
            rows: Vec::new(),
            failures: Vec::new(),
            missing_statuses: 0,
        }
    }

    pub fn absorb(&mut self, scan: NamespaceScan) {
        self.missing_statuses += scan.missing_statuses;
        self.rows.extend(scan.rows);
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn format_duration_seconds(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

fn format_elapsed_seconds(seconds: u64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::{AgeFormat, PodPhase};

    #[test]
    fn phase_tokens_map_to_expected_phases() {
        assert_eq!(PodPhase::from_token("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from_token("succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from_token(" Failed "), PodPhase::Failed);
        assert_eq!(PodPhase::from_token("Pending"), PodPhase::Pending);
        assert_eq!(PodPhase::from_token(""), PodPhase::Unknown);
        assert_eq!(PodPhase::from_token("Evicted"), PodPhase::Unknown);
        assert_eq!(PodPhase::Running.to_string(), "Running");
    }

    #[test]
    fn precise_age_matches_duration_style() {
        assert_eq!(AgeFormat::Precise.render(0), "0s");
        assert_eq!(AgeFormat::Precise.render(45), "45s");
        assert_eq!(AgeFormat::Precise.render(120), "2m0s");
        assert_eq!(AgeFormat::Precise.render(3 * 3_600 + 2 * 60 + 10), "3h2m10s");
        assert_eq!(AgeFormat::Precise.render(50 * 3_600), "50h0m0s");
    }

    #[test]
    fn compact_age_keeps_largest_unit() {
        assert_eq!(AgeFormat::Compact.render(40), "40s");
        assert_eq!(AgeFormat::Compact.render(12 * 60 + 5), "12m");
        assert_eq!(AgeFormat::Compact.render(4 * 3_600), "4h");
        assert_eq!(AgeFormat::Compact.render(3 * 86_400 + 10), "3d");
    }
}
