//! Emergency alert service: broadcast, track and acknowledge alerts.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{decode, decode_list, single_outcome};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{AlertDraft, AlertPatch, AlertSeverity, EmergencyAlert};
use crate::store::memory::collections;
use crate::store::{Direction, FilterOp, Query, RecordStore};

const ENTITY: &str = "Emergency alert";
const DEFAULT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct EmergencyService {
    store: Arc<dyn RecordStore>,
}

impl EmergencyService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        EmergencyService { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<EmergencyAlert> {
        self.fetch(&Query::default()).await
    }

    #[instrument(skip(self))]
    pub async fn recent(&self, limit: Option<usize>) -> Vec<EmergencyAlert> {
        let query = Query::default()
            .ordered("timestamp", Direction::Desc)
            .paged(limit.unwrap_or(DEFAULT_LIMIT), 0);
        self.fetch(&query).await
    }

    #[instrument(skip(self))]
    pub async fn by_severity(&self, severity: AlertSeverity) -> Vec<EmergencyAlert> {
        let query = Query::default().filtered("severity", FilterOp::Eq, json!(severity));
        self.fetch(&query).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<EmergencyAlert> {
        let record = self
            .store
            .get_record_by_id(collections::EMERGENCY_ALERT, id, &[])
            .await?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        decode(record)
    }

    /// Sends an alert. Omitted fields get their send-time defaults: status
    /// `"Sent"`, sender `"System"`, timestamp now, nobody acknowledged yet.
    #[instrument(skip(self, draft), fields(severity = draft.severity.as_str()))]
    pub async fn create(&self, draft: AlertDraft) -> ServiceResult<EmergencyAlert> {
        let now = Utc::now();
        let record = json!({
            "severity": draft.severity,
            "message": draft.message,
            "recipients": draft.recipients,
            "timestamp": draft.timestamp.unwrap_or(now),
            "status": draft.status.unwrap_or_else(|| "Sent".into()),
            "sentBy": draft.sent_by.unwrap_or_else(|| "System".into()),
            "acknowledgedBy": [],
            "createdAt": now,
            "updatedAt": now,
        });

        let outcomes = self
            .store
            .create_records(collections::EMERGENCY_ALERT, vec![record])
            .await?;
        let alert: EmergencyAlert = decode(single_outcome(ENTITY, None, outcomes)?)?;
        info!(id = alert.id, "emergency alert sent");
        Ok(alert)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: AlertPatch) -> ServiceResult<EmergencyAlert> {
        let mut record = serde_json::to_value(&patch)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        record["Id"] = json!(id);
        record["updatedAt"] = json!(Utc::now());

        let outcomes = self
            .store
            .update_records(collections::EMERGENCY_ALERT, vec![record])
            .await?;
        decode(single_outcome(ENTITY, Some(id), outcomes)?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let outcomes = self
            .store
            .delete_records(collections::EMERGENCY_ALERT, vec![id])
            .await?;
        single_outcome(ENTITY, Some(id), outcomes).map(|_| ())
    }

    /// Adds the acknowledger to the alert, once. Acknowledging twice is a
    /// no-op that still returns the current alert.
    #[instrument(skip(self))]
    pub async fn acknowledge(&self, id: i64, acknowledged_by: &str) -> ServiceResult<EmergencyAlert> {
        let mut alert = self.get(id).await?;
        if alert.acknowledged_by.iter().any(|who| who == acknowledged_by) {
            return Ok(alert);
        }

        alert.acknowledged_by.push(acknowledged_by.to_string());
        let record = json!({
            "Id": id,
            "acknowledgedBy": alert.acknowledged_by,
            "updatedAt": Utc::now(),
        });
        let outcomes = self
            .store
            .update_records(collections::EMERGENCY_ALERT, vec![record])
            .await?;
        decode(single_outcome(ENTITY, Some(id), outcomes)?)
    }

    async fn fetch(&self, query: &Query) -> Vec<EmergencyAlert> {
        match self
            .store
            .fetch_records(collections::EMERGENCY_ALERT, query)
            .await
        {
            Ok(records) => decode_list(collections::EMERGENCY_ALERT, records),
            Err(err) => {
                warn!(%err, "failed to fetch emergency alerts");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> EmergencyService {
        EmergencyService::new(Arc::new(InMemoryStore::with_fixtures().unwrap()))
    }

    #[tokio::test]
    async fn create_fills_send_time_defaults() {
        let service = service();
        let alert = service
            .create(AlertDraft {
                severity: AlertSeverity::Critical,
                message: "Code Blue in ward A".into(),
                recipients: vec!["doctors".into(), "ward-a".into()],
                timestamp: None,
                status: None,
                sent_by: None,
            })
            .await
            .unwrap();

        assert_eq!(alert.status, "Sent");
        assert_eq!(alert.sent_by, "System");
        assert!(alert.acknowledged_by.is_empty());
    }

    #[tokio::test]
    async fn acknowledge_adds_each_acknowledger_once() {
        let service = service();

        let alert = service.acknowledge(2, "nurse.kim").await.unwrap();
        assert_eq!(alert.acknowledged_by, vec!["nurse.kim"]);

        // Second acknowledgement by the same person changes nothing.
        let alert = service.acknowledge(2, "nurse.kim").await.unwrap();
        assert_eq!(alert.acknowledged_by, vec!["nurse.kim"]);

        let alert = service.acknowledge(2, "nurse.oduya").await.unwrap();
        assert_eq!(alert.acknowledged_by.len(), 2);
    }

    #[tokio::test]
    async fn severity_filter_and_recency_cap_apply() {
        let service = service();
        let critical = service.by_severity(AlertSeverity::Critical).await;
        assert!(critical
            .iter()
            .all(|alert| alert.severity == AlertSeverity::Critical));
        assert!(!critical.is_empty());

        assert_eq!(service.recent(Some(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let service = service();
        assert!(matches!(
            service.acknowledge(99, "nobody").await.unwrap_err(),
            ServiceError::NotFound { id: 99, .. }
        ));
    }
}
