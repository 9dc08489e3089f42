use serde::{Deserialize, Serialize};

use crate::models::lenient;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::millis")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::millis")]
    pub resolved_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl Report {
    /// Reports without a status are open.
    pub fn is_resolved(&self) -> bool {
        self.status
            .as_deref()
            .map(|status| status.eq_ignore_ascii_case("resolved"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFilter {
    #[default]
    All,
    Open,
    Resolved,
}

impl ReportFilter {
    pub fn accepts(&self, report: &Report) -> bool {
        match self {
            ReportFilter::All => true,
            ReportFilter::Open => !report.is_resolved(),
            ReportFilter::Resolved => report.is_resolved(),
        }
    }
}
