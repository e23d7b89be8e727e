//! Staff directory service.

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use super::{decode, decode_list, single_outcome};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{StaffDraft, StaffMember};
use crate::store::memory::collections;
use crate::store::{Direction, Query, RecordStore};

const ENTITY: &str = "Staff member";
const DEFAULT_PAGE_LIMIT: usize = 50;

fn fields() -> Vec<String> {
    ["Name", "role", "department", "contactInformation", "Tags", "Owner"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Clone)]
pub struct StaffService {
    store: Arc<dyn RecordStore>,
    page_limit: usize,
}

impl StaffService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        StaffService {
            store,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// First page of the directory, ordered by name.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<StaffMember> {
        let query = Query::select(fields())
            .ordered("Name", Direction::Asc)
            .paged(self.page_limit, 0);
        match self.store.fetch_records(collections::STAFF, &query).await {
            Ok(records) => decode_list(collections::STAFF, records),
            Err(err) => {
                warn!(%err, "failed to fetch staff");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<StaffMember> {
        let record = self
            .store
            .get_record_by_id(collections::STAFF, id, &fields())
            .await?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        decode(record)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: StaffDraft) -> ServiceResult<StaffMember> {
        let record = serde_json::to_value(&draft)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        let outcomes = self
            .store
            .create_records(collections::STAFF, vec![record])
            .await?;
        decode(single_outcome(ENTITY, None, outcomes)?)
    }

    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: i64, draft: StaffDraft) -> ServiceResult<StaffMember> {
        let mut record = serde_json::to_value(&draft)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        record["Id"] = json!(id);
        let outcomes = self
            .store
            .update_records(collections::STAFF, vec![record])
            .await?;
        decode(single_outcome(ENTITY, Some(id), outcomes)?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let outcomes = self
            .store
            .delete_records(collections::STAFF, vec![id])
            .await?;
        single_outcome(ENTITY, Some(id), outcomes).map(|_| ())
    }
}
