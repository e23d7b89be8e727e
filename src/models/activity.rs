use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Admission,
    Discharge,
    Critical,
    Surgery,
    Medication,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Feed entry on the dashboard. Written once when something happens to a
/// patient; never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Weak reference: used for lookups only, never enforced by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_patient_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_patient_id: Option<i64>,
}
