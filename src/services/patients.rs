//! Patient roster service.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{decode, decode_list, single_outcome, ActivityService};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    parse_when, ActivityDraft, ActivityType, Patient, PatientDraft, PatientPatch, Severity,
};
use crate::store::memory::collections;
use crate::store::{Query, RecordStore};

const ENTITY: &str = "Patient";

fn fields() -> Vec<String> {
    [
        "Name",
        "age",
        "roomNumber",
        "attendingDoctor",
        "admissionStatus",
        "admissionDate",
        "admissionFrom",
        "admissionTo",
        "condition",
        "emergencyContact",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// When both the admission timestamp and the admission-start timestamp are
/// supplied they must name the same instant. Checked before dispatch: a
/// violation never reaches the store.
fn ensure_admission_instants_match(date: &str, from: &str) -> ServiceResult<()> {
    let identical = match (parse_when(date), parse_when(from)) {
        (Some(a), Some(b)) => a == b,
        // Unparsable on either side: fall back to the raw strings.
        _ => date.trim() == from.trim(),
    };
    if identical {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "admissionDate and admissionFrom must be identical".into(),
        ))
    }
}

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn RecordStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        PatientService { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<Patient> {
        match self
            .store
            .fetch_records(collections::PATIENT, &Query::select(fields()))
            .await
        {
            Ok(records) => decode_list(collections::PATIENT, records),
            Err(err) => {
                warn!(%err, "failed to fetch patients");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<Patient> {
        let record = self
            .store
            .get_record_by_id(collections::PATIENT, id, &fields())
            .await?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        decode(record)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: PatientDraft) -> ServiceResult<Patient> {
        draft
            .validate()
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        if let Some(from) = draft.admission_from.as_deref() {
            ensure_admission_instants_match(&draft.admission_date, from)?;
        }

        let record = serde_json::to_value(&draft)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        let outcomes = self
            .store
            .create_records(collections::PATIENT, vec![record])
            .await?;
        let patient: Patient = decode(single_outcome(ENTITY, None, outcomes)?)?;
        info!(id = patient.id, "patient registered");
        Ok(patient)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: PatientPatch) -> ServiceResult<Patient> {
        if let (Some(date), Some(from)) = (&patch.admission_date, &patch.admission_from) {
            ensure_admission_instants_match(date, from)?;
        }

        let mut record = serde_json::to_value(&patch)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        record["Id"] = json!(id);
        let outcomes = self
            .store
            .update_records(collections::PATIENT, vec![record])
            .await?;
        decode(single_outcome(ENTITY, Some(id), outcomes)?)
    }

    /// The dashboards never delete patients; the operation exists for parity
    /// with the store's surface.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let outcomes = self
            .store
            .delete_records(collections::PATIENT, vec![id])
            .await?;
        single_outcome(ENTITY, Some(id), outcomes).map(|_| ())
    }
}

/// Registration flow: create the patient, then record the admission in the
/// activity feed. A failed activity write does not undo the registration;
/// it is logged and the new patient is still returned.
pub async fn register_patient(
    patients: &PatientService,
    activities: &ActivityService,
    draft: PatientDraft,
) -> ServiceResult<Patient> {
    let patient = patients.create(draft).await?;

    let admission = ActivityDraft {
        name: format!("Patient Registration - {}", patient.name),
        kind: ActivityType::Admission,
        description: format!(
            "New patient {} registered in room {} under {}",
            patient.name, patient.room_number, patient.attending_doctor
        ),
        severity: Severity::Medium,
        related_patient_id: Some(patient.id),
    };
    if let Err(err) = activities.create(admission).await {
        warn!(%err, patient = patient.id, "admission activity was not recorded");
    }

    Ok(patient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdmissionStatus;
    use crate::store::{InMemoryStore, MockRecordStore};

    fn draft() -> PatientDraft {
        PatientDraft {
            name: "Alice Morgan".into(),
            age: 54,
            room_number: "A-101".into(),
            attending_doctor: "Dr. Chen".into(),
            admission_status: AdmissionStatus::Stable,
            admission_date: "2024-01-01T00:00".into(),
            admission_from: None,
            admission_to: None,
            condition: "Pneumonia".into(),
            emergency_contact: "555-0134".into(),
        }
    }

    #[tokio::test]
    async fn mismatched_admission_instants_never_reach_the_store() {
        // No expectations: any store call panics the test.
        let store = MockRecordStore::new();
        let service = PatientService::new(Arc::new(store));

        let mut bad = draft();
        bad.admission_from = Some("2024-01-02T00:00".into());

        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn matching_admission_instants_pass_the_invariant() {
        let store = InMemoryStore::new();
        let service = PatientService::new(Arc::new(store));

        let mut ok = draft();
        // Same instant, different precision.
        ok.admission_date = "2024-01-01T00:00".into();
        ok.admission_from = Some("2024-01-01T00:00:00Z".into());

        let patient = service.create(ok).await.unwrap();
        assert_eq!(patient.id, 1);
    }

    #[tokio::test]
    async fn draft_validation_rejects_out_of_range_age() {
        let store = MockRecordStore::new();
        let service = PatientService::new(Arc::new(store));

        let mut bad = draft();
        bad.age = 0;
        assert!(matches!(
            service.create(bad).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn list_returns_empty_when_the_store_fails() {
        let mut store = MockRecordStore::new();
        store
            .expect_fetch_records()
            .returning(|_, _| Err(crate::store::StoreError::Remote("503".into())));
        let service = PatientService::new(Arc::new(store));

        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn get_maps_missing_records_to_not_found() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_record_by_id()
            .returning(|_, _, _| Ok(None));
        let service = PatientService::new(Arc::new(store));

        assert!(matches!(
            service.get(42).await.unwrap_err(),
            ServiceError::NotFound { id: 42, .. }
        ));
    }

    #[tokio::test]
    async fn update_merges_through_the_store() {
        let store = Arc::new(InMemoryStore::new());
        let service = PatientService::new(store.clone());
        service.create(draft()).await.unwrap();

        let patch = PatientPatch {
            condition: Some("Improving".into()),
            ..PatientPatch::default()
        };
        let updated = service.update(1, patch).await.unwrap();
        assert_eq!(updated.condition, "Improving");
        assert_eq!(updated.name, "Alice Morgan");

        assert!(matches!(
            service.update(99, PatientPatch::default()).await.unwrap_err(),
            ServiceError::NotFound { id: 99, .. }
        ));
    }

    #[tokio::test]
    async fn registration_records_an_admission_activity() {
        let store = Arc::new(InMemoryStore::new());
        let patients = PatientService::new(store.clone());
        let activities = ActivityService::new(store.clone());

        let patient = register_patient(&patients, &activities, draft())
            .await
            .unwrap();

        let feed = activities.for_patient(patient.id).await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, ActivityType::Admission);
        assert!(feed[0].description.contains("A-101"));
    }
}
