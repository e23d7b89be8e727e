//! Activity feed service. Entries are written once and only ever read back.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{instrument, warn};

use super::{decode, decode_list, single_outcome};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Activity, ActivityDraft, ActivityType};
use crate::store::memory::collections;
use crate::store::{Direction, FilterOp, Query, RecordStore};

const ENTITY: &str = "Activity";
const DEFAULT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn RecordStore>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        ActivityService { store }
    }

    /// Newest entries first, capped at `limit` (the dashboard shows ten).
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: Option<usize>) -> Vec<Activity> {
        let query = Query::default()
            .ordered("timestamp", Direction::Desc)
            .paged(limit.unwrap_or(DEFAULT_LIMIT), 0);
        self.fetch(&query).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<Activity> {
        let record = self
            .store
            .get_record_by_id(collections::ACTIVITY, id, &[])
            .await?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        decode(record)
    }

    /// Stamps the entry with the current time; callers never supply one.
    #[instrument(skip(self, draft), fields(kind = ?draft.kind))]
    pub async fn create(&self, draft: ActivityDraft) -> ServiceResult<Activity> {
        let mut record = serde_json::to_value(&draft)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        record["timestamp"] = json!(Utc::now());

        let outcomes = self
            .store
            .create_records(collections::ACTIVITY, vec![record])
            .await?;
        decode(single_outcome(ENTITY, None, outcomes)?)
    }

    #[instrument(skip(self))]
    pub async fn for_patient(&self, patient_id: i64) -> Vec<Activity> {
        let query = Query::default()
            .filtered("relatedPatientId", FilterOp::Eq, json!(patient_id))
            .ordered("timestamp", Direction::Desc);
        self.fetch(&query).await
    }

    #[instrument(skip(self))]
    pub async fn of_type(&self, kind: ActivityType) -> Vec<Activity> {
        let query = Query::default()
            .filtered("type", FilterOp::Eq, json!(kind))
            .ordered("timestamp", Direction::Desc);
        self.fetch(&query).await
    }

    async fn fetch(&self, query: &Query) -> Vec<Activity> {
        match self.store.fetch_records(collections::ACTIVITY, query).await {
            Ok(records) => decode_list(collections::ACTIVITY, records),
            Err(err) => {
                warn!(%err, "failed to fetch activities");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::store::InMemoryStore;

    fn service() -> ActivityService {
        ActivityService::new(Arc::new(InMemoryStore::new()))
    }

    fn entry(kind: ActivityType, patient: Option<i64>) -> ActivityDraft {
        ActivityDraft {
            name: "Test".into(),
            kind,
            description: "test entry".into(),
            severity: Severity::Low,
            related_patient_id: patient,
        }
    }

    #[tokio::test]
    async fn created_entries_are_stamped_and_assigned_ids() {
        let service = service();
        let first = service
            .create(entry(ActivityType::Admission, Some(1)))
            .await
            .unwrap();
        let second = service
            .create(entry(ActivityType::Discharge, Some(1)))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.timestamp >= first.timestamp);
    }

    #[tokio::test]
    async fn queries_narrow_by_patient_and_type() {
        let service = service();
        service
            .create(entry(ActivityType::Admission, Some(1)))
            .await
            .unwrap();
        service
            .create(entry(ActivityType::Medication, Some(2)))
            .await
            .unwrap();
        service
            .create(entry(ActivityType::Medication, None))
            .await
            .unwrap();

        assert_eq!(service.for_patient(1).await.len(), 1);
        assert_eq!(service.of_type(ActivityType::Medication).await.len(), 2);
        assert_eq!(service.recent(Some(2)).await.len(), 2);
    }
}
