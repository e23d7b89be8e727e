//! Data models for the Wardwatch core.
//!
//! Record shapes mirror the remote collections: `Id`/`Name` are capitalized
//! by the store, everything else travels as camelCase.

pub mod activity;
pub mod alert;
pub mod metric;
pub mod patient;
pub mod staff;

pub use activity::{Activity, ActivityDraft, ActivityType, Severity};
pub use alert::{AlertDraft, AlertPatch, AlertSeverity, EmergencyAlert};
pub use metric::{Metric, MetricPatch, Trend};
pub use patient::{AdmissionStatus, Patient, PatientDraft, PatientPatch};
pub use staff::{StaffDraft, StaffMember};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses the timestamp strings the store hands back. They arrive in mixed
/// precision: full RFC 3339, `datetime-local` form values without seconds,
/// or bare dates. Returns `None` instead of failing on garbage.
pub(crate) fn parse_when(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::parse_when;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_mixed_precision_timestamps() {
        let date_only = parse_when("2024-01-01").unwrap();
        assert_eq!((date_only.year(), date_only.hour()), (2024, 0));

        let form_value = parse_when("2024-01-02T08:30").unwrap();
        assert_eq!((form_value.hour(), form_value.minute()), (8, 30));

        let rfc3339 = parse_when("2024-03-05T12:00:00Z").unwrap();
        assert_eq!(rfc3339.day(), 5);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_when("").is_none());
        assert!(parse_when("not-a-date").is_none());
        assert!(parse_when("2024-13-40").is_none());
    }
}
