//! Entity services over the remote record store.
//!
//! One service per collection. Single-record operations surface failures as
//! [`ServiceError`](crate::error::ServiceError); list operations log and
//! return an empty collection, so callers cannot distinguish "no data" from
//! "fetch failed". That is the behavior the dashboards were built against,
//! and the warning in the log is the only trace.

pub mod activities;
pub mod emergency;
pub mod metrics;
pub mod patients;
pub mod staff;

pub use activities::ActivityService;
pub use emergency::EmergencyService;
pub use metrics::MetricsService;
pub use patients::{register_patient, PatientService};
pub use staff::StaffService;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::store::RecordOutcome;

/// Unpacks the outcome of a single-record batch call. Field-level errors
/// become `Validation` (first error wins, `"{label}: {message}"`); a bare
/// failure is `NotFound` when the call addressed an id, `Validation`
/// otherwise.
pub(crate) fn single_outcome(
    entity: &'static str,
    id: Option<i64>,
    outcomes: Vec<RecordOutcome>,
) -> ServiceResult<Value> {
    let Some(outcome) = outcomes.into_iter().next() else {
        return Err(ServiceError::Remote("store returned no outcome".into()));
    };
    if outcome.success {
        return outcome
            .data
            .ok_or_else(|| ServiceError::Remote("outcome carried no record".into()));
    }
    if let Some(field_error) = outcome.errors.first() {
        return Err(ServiceError::Validation(format!(
            "{}: {}",
            field_error.field_label, field_error.message
        )));
    }
    match id {
        Some(id) => Err(ServiceError::NotFound { entity, id }),
        None => Err(ServiceError::Validation(
            outcome.message.unwrap_or_else(|| "record rejected".into()),
        )),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(record: Value) -> ServiceResult<T> {
    serde_json::from_value(record).map_err(|err| ServiceError::Remote(err.to_string()))
}

/// Decodes a fetched page, dropping records that no longer match the model.
pub(crate) fn decode_list<T: DeserializeOwned>(collection: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(collection, %err, "skipping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldError;
    use serde_json::json;

    #[test]
    fn field_errors_surface_as_validation_label_message() {
        let outcome = RecordOutcome {
            success: false,
            data: None,
            message: Some("rejected".into()),
            errors: vec![FieldError {
                field_label: "Age".into(),
                message: "must be between 1 and 120".into(),
            }],
        };
        let err = single_outcome("Patient", None, vec![outcome]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "Age: must be between 1 and 120"));
    }

    #[test]
    fn bare_failure_with_id_is_not_found() {
        let outcomes = vec![RecordOutcome::failed("Record does not exist")];
        let err = single_outcome("Patient", Some(9), outcomes).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id: 9, .. }));
    }

    #[test]
    fn success_yields_the_record() {
        let outcomes = vec![RecordOutcome::ok(json!({"Id": 1}))];
        let record = single_outcome("Patient", None, outcomes).unwrap();
        assert_eq!(record["Id"], 1);
    }
}
