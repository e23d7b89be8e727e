//! Dashboard metrics service. The seeded list is what the live feed mutates.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{instrument, warn};

use super::{decode, decode_list, single_outcome};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Metric, MetricPatch};
use crate::store::memory::collections;
use crate::store::{Query, RecordStore};

const ENTITY: &str = "Metric";

#[derive(Clone)]
pub struct MetricsService {
    store: Arc<dyn RecordStore>,
}

impl MetricsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        MetricsService { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<Metric> {
        match self
            .store
            .fetch_records(collections::METRIC, &Query::default())
            .await
        {
            Ok(records) => decode_list(collections::METRIC, records),
            Err(err) => {
                warn!(%err, "failed to fetch metrics");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<Metric> {
        let record = self
            .store
            .get_record_by_id(collections::METRIC, id, &[])
            .await?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        decode(record)
    }

    /// Merges the supplied fields and stamps `lastUpdated`.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: MetricPatch) -> ServiceResult<Metric> {
        let mut record = serde_json::to_value(&patch)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        record["Id"] = json!(id);
        record["lastUpdated"] = json!(Utc::now());

        let outcomes = self
            .store
            .update_records(collections::METRIC, vec![record])
            .await?;
        decode(single_outcome(ENTITY, Some(id), outcomes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trend;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn update_stamps_last_updated() {
        let store = InMemoryStore::with_fixtures().unwrap();
        let service = MetricsService::new(Arc::new(store));

        let before = service.get(1).await.unwrap();
        let patch = MetricPatch {
            value: Some(before.value + 5.0),
            trend: Some(Trend::Up),
            ..MetricPatch::default()
        };
        let after = service.update(1, patch).await.unwrap();

        assert_eq!(after.value, before.value + 5.0);
        assert_eq!(after.trend, Trend::Up);
        assert!(after.last_updated > before.last_updated);
        assert_eq!(after.label, before.label);
    }

    #[tokio::test]
    async fn unknown_metric_is_not_found() {
        let store = InMemoryStore::with_fixtures().unwrap();
        let service = MetricsService::new(Arc::new(store));
        assert!(matches!(
            service.update(99, MetricPatch::default()).await.unwrap_err(),
            ServiceError::NotFound { id: 99, .. }
        ));
    }
}
