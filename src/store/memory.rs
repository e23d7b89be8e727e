//! Fixture-backed store used for offline/demo operation and in tests.
//!
//! Holds every collection in memory only: nothing survives a restart, which
//! is exactly how the mock data mode of the hosted store behaves.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    Direction, FieldFilter, FilterOp, Query, RecordOutcome, RecordStore, StoreResult,
};

/// Collection names as the remote store knows them.
pub mod collections {
    pub const PATIENT: &str = "patient";
    pub const STAFF: &str = "staff";
    pub const ACTIVITY: &str = "app_Activity";
    pub const METRIC: &str = "metric";
    pub const EMERGENCY_ALERT: &str = "emergency_alert";
}

pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds the five collections from the bundled fixture files.
    pub fn with_fixtures() -> Result<Self, serde_json::Error> {
        let mut seeded: HashMap<String, Vec<Value>> = HashMap::new();
        for (name, raw) in [
            (collections::PATIENT, include_str!("../../fixtures/patients.json")),
            (collections::STAFF, include_str!("../../fixtures/staff.json")),
            (collections::ACTIVITY, include_str!("../../fixtures/activities.json")),
            (collections::METRIC, include_str!("../../fixtures/metrics.json")),
            (
                collections::EMERGENCY_ALERT,
                include_str!("../../fixtures/emergency_alerts.json"),
            ),
        ] {
            let records: Vec<Value> = serde_json::from_str(raw)?;
            debug!(collection = name, count = records.len(), "seeded fixture collection");
            seeded.insert(name.to_string(), records);
        }
        Ok(InMemoryStore {
            collections: RwLock::new(seeded),
        })
    }

    /// Seeds a single collection with the given records, as-is.
    pub async fn seed(&self, collection: &str, records: Vec<Value>) {
        self.collections
            .write()
            .await
            .insert(collection.to_string(), records);
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("Id").and_then(Value::as_i64)
}

fn next_id(records: &[Value]) -> i64 {
    records.iter().filter_map(record_id).max().unwrap_or(0) + 1
}

/// Loose comparison across the JSON types predicates actually use: numbers
/// compare numerically, strings lexically (ISO timestamps order correctly).
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn matches(record: &Value, filter: &FieldFilter) -> bool {
    let Some(actual) = record.get(&filter.field) else {
        return false;
    };
    match compare_values(actual, &filter.value) {
        Some(ordering) => match filter.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Gte => ordering != Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
        },
        // Mixed types only make sense for equality.
        None => filter.op == FilterOp::Eq && actual == &filter.value,
    }
}

fn project(record: &Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = Map::new();
    if let Some(id) = record.get("Id") {
        out.insert("Id".to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = record.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch_records(&self, collection: &str, query: &Query) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let mut records: Vec<Value> = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| query.filters.iter().all(|f| matches(record, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            records.sort_by(|a, b| {
                let ordering = match (a.get(&order.field), b.get(&order.field)) {
                    (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(paging) = query.paging {
            records = records
                .into_iter()
                .skip(paging.offset)
                .take(paging.limit)
                .collect();
        }

        Ok(records
            .iter()
            .map(|record| project(record, &query.fields))
            .collect())
    }

    async fn get_record_by_id(
        &self,
        collection: &str,
        id: i64,
        fields: &[String],
    ) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|record| record_id(record) == Some(id)))
            .map(|record| project(record, fields)))
    }

    async fn create_records(
        &self,
        collection: &str,
        records: Vec<Value>,
    ) -> StoreResult<Vec<RecordOutcome>> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let Value::Object(fields) = record else {
                outcomes.push(RecordOutcome::failed("record must be an object"));
                continue;
            };
            let mut fields = fields;
            fields.insert("Id".to_string(), json!(next_id(stored)));
            let record = Value::Object(fields);
            stored.push(record.clone());
            outcomes.push(RecordOutcome::ok(record));
        }
        Ok(outcomes)
    }

    async fn update_records(
        &self,
        collection: &str,
        records: Vec<Value>,
    ) -> StoreResult<Vec<RecordOutcome>> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let Some(id) = record_id(&record) else {
                outcomes.push(RecordOutcome::failed("record is missing its Id"));
                continue;
            };
            let Some(existing) = stored
                .iter_mut()
                .find(|candidate| record_id(candidate) == Some(id))
            else {
                outcomes.push(RecordOutcome::failed("Record does not exist"));
                continue;
            };
            if let (Value::Object(target), Value::Object(updates)) = (&mut *existing, &record) {
                for (key, value) in updates {
                    target.insert(key.clone(), value.clone());
                }
            }
            outcomes.push(RecordOutcome::ok(existing.clone()));
        }
        Ok(outcomes)
    }

    async fn delete_records(
        &self,
        collection: &str,
        ids: Vec<i64>,
    ) -> StoreResult<Vec<RecordOutcome>> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match stored
                .iter()
                .position(|record| record_id(record) == Some(id))
            {
                Some(index) => outcomes.push(RecordOutcome::ok(stored.remove(index))),
                None => outcomes.push(RecordOutcome::failed("Record does not exist")),
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixtures_seed_every_collection() {
        let store = InMemoryStore::with_fixtures().unwrap();
        for name in [
            collections::PATIENT,
            collections::STAFF,
            collections::ACTIVITY,
            collections::METRIC,
            collections::EMERGENCY_ALERT,
        ] {
            let records = store.fetch_records(name, &Query::default()).await.unwrap();
            assert!(!records.is_empty(), "{name} fixture is empty");
        }
    }

    #[tokio::test]
    async fn create_assigns_incrementing_ids() {
        let store = InMemoryStore::new();
        store
            .seed("patient", vec![json!({"Id": 7, "Name": "Seed"})])
            .await;

        let outcomes = store
            .create_records("patient", vec![json!({"Name": "A"}), json!({"Name": "B"})])
            .await
            .unwrap();

        let ids: Vec<i64> = outcomes
            .iter()
            .map(|o| o.data.as_ref().unwrap()["Id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![8, 9]);
    }

    #[tokio::test]
    async fn predicates_order_and_paging_apply() {
        let store = InMemoryStore::new();
        store
            .seed(
                "staff",
                vec![
                    json!({"Id": 1, "Name": "Cara", "department": "ICU"}),
                    json!({"Id": 2, "Name": "Abe", "department": "ICU"}),
                    json!({"Id": 3, "Name": "Bea", "department": "ER"}),
                ],
            )
            .await;

        let query = Query::default()
            .filtered("department", FilterOp::Eq, json!("ICU"))
            .ordered("Name", Direction::Asc)
            .paged(1, 0);
        let records = store.fetch_records("staff", &query).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Name"], "Abe");
    }

    #[tokio::test]
    async fn range_predicates_compare_iso_strings() {
        let store = InMemoryStore::new();
        store
            .seed(
                "app_Activity",
                vec![
                    json!({"Id": 1, "timestamp": "2024-01-01T10:00:00Z"}),
                    json!({"Id": 2, "timestamp": "2024-02-01T10:00:00Z"}),
                ],
            )
            .await;

        let query =
            Query::default().filtered("timestamp", FilterOp::Gte, json!("2024-01-15T00:00:00Z"));
        let records = store.fetch_records("app_Activity", &query).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Id"], 2);
    }

    #[tokio::test]
    async fn update_merges_supplied_fields_only() {
        let store = InMemoryStore::new();
        store
            .seed(
                "patient",
                vec![json!({"Id": 1, "Name": "Alice", "condition": "Stable"})],
            )
            .await;

        let outcomes = store
            .update_records("patient", vec![json!({"Id": 1, "condition": "Improving"})])
            .await
            .unwrap();
        assert!(outcomes[0].success);
        let updated = outcomes[0].data.as_ref().unwrap();
        assert_eq!(updated["Name"], "Alice");
        assert_eq!(updated["condition"], "Improving");
    }

    #[tokio::test]
    async fn missing_records_fail_per_record_not_per_batch() {
        let store = InMemoryStore::new();
        store.seed("patient", vec![json!({"Id": 1})]).await;

        let outcomes = store
            .update_records(
                "patient",
                vec![json!({"Id": 1, "condition": "ok"}), json!({"Id": 99})],
            )
            .await
            .unwrap();
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);

        let outcomes = store.delete_records("patient", vec![1, 99]).await.unwrap();
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
    }

    #[tokio::test]
    async fn projection_keeps_id_and_requested_fields() {
        let store = InMemoryStore::new();
        store
            .seed(
                "staff",
                vec![json!({"Id": 4, "Name": "Rae", "role": "RN", "department": "ER"})],
            )
            .await;

        let records = store
            .fetch_records("staff", &Query::select(["Name"]))
            .await
            .unwrap();
        assert_eq!(records[0], json!({"Id": 4, "Name": "Rae"}));
    }
}
