//! Remote record-store boundary.
//!
//! The hosted store is a generic record-query service: every call names a
//! collection and works on loosely-typed records. Services serialize their
//! typed models through serde instead of shaping fields by hand, and talk to
//! the store only through the [`RecordStore`] trait so the hosted client can
//! be swapped for the fixture-backed [`InMemoryStore`].

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use thiserror::Error;

pub mod memory;

pub use memory::InMemoryStore;

/// Store-level failure: the success=false envelope, or the transport itself.
/// Per-record problems inside a batch are reported through [`RecordOutcome`]
/// instead, so a multi-record call can partially succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Remote(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub limit: usize,
    pub offset: usize,
}

/// Field projection, predicates and ordering for a fetch.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub fields: Vec<String>,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub paging: Option<Paging>,
}

impl Query {
    pub fn select<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Query::default()
        }
    }

    pub fn filtered(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn ordered(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn paged(mut self, limit: usize, offset: usize) -> Self {
        self.paging = Some(Paging { limit, offset });
        self
    }
}

/// Result for one record of a batch create/update/delete.
#[derive(Debug, Clone, Default)]
pub struct RecordOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub message: Option<String>,
    pub errors: Vec<FieldError>,
}

impl RecordOutcome {
    pub fn ok(data: Value) -> Self {
        RecordOutcome {
            success: true,
            data: Some(data),
            ..RecordOutcome::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        RecordOutcome {
            success: false,
            message: Some(message.into()),
            ..RecordOutcome::default()
        }
    }
}

/// Remote field-level validation error attached to a failed record.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub field_label: String,
    pub message: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_records(&self, collection: &str, query: &Query) -> StoreResult<Vec<Value>>;

    /// `Ok(None)` means the collection has no record with that id.
    async fn get_record_by_id(
        &self,
        collection: &str,
        id: i64,
        fields: &[String],
    ) -> StoreResult<Option<Value>>;

    async fn create_records(
        &self,
        collection: &str,
        records: Vec<Value>,
    ) -> StoreResult<Vec<RecordOutcome>>;

    /// Each record must carry its `Id`; unknown ids fail per record.
    async fn update_records(
        &self,
        collection: &str,
        records: Vec<Value>,
    ) -> StoreResult<Vec<RecordOutcome>>;

    async fn delete_records(&self, collection: &str, ids: Vec<i64>)
        -> StoreResult<Vec<RecordOutcome>>;
}
