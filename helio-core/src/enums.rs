//! Enumerations for project status and report variants.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PROJECT STATUS
// ============================================================================

/// Lifecycle status of a project as written by the upstream services.
///
/// Only [`ProjectStatus::Paid`] grants a report. Status strings the service
/// does not recognise are preserved verbatim in `Unknown` so they can still
/// be exported, and they never grant entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    Pending,
    Paid,
    Calculating,
    Completed,
    Error,
    Unknown(String),
}

impl ProjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Paid => "paid",
            ProjectStatus::Calculating => "calculating",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
            ProjectStatus::Unknown(raw) => raw.as_str(),
        }
    }

    /// Whether a report may be produced for a project in this status.
    pub fn is_entitled(&self) -> bool {
        matches!(self, ProjectStatus::Paid)
    }
}

impl From<&str> for ProjectStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => ProjectStatus::Pending,
            "paid" => ProjectStatus::Paid,
            "calculating" => ProjectStatus::Calculating,
            "completed" => ProjectStatus::Completed,
            "error" => ProjectStatus::Error,
            _ => ProjectStatus::Unknown(raw.to_string()),
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(raw: String) -> Self {
        ProjectStatus::from(raw.as_str())
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REPORT FORMAT
// ============================================================================

/// Requested report variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Detailed,
    Summary,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 2] = [ReportFormat::Detailed, ReportFormat::Summary];

    /// Interpret the `format` query parameter. Unknown or absent values
    /// fall back to [`ReportFormat::Detailed`].
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(value) if value == "summary" => ReportFormat::Summary,
            _ => ReportFormat::Detailed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Detailed => "detailed",
            ReportFormat::Summary => "summary",
        }
    }

    /// Name of the template that renders this variant.
    pub fn template_name(&self) -> &'static str {
        match self {
            ReportFormat::Detailed => "report_detailed.html",
            ReportFormat::Summary => "report_summary.html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
