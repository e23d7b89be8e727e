//! Error taxonomy shared by the entity services.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A local invariant failed before dispatch, or the store returned
    /// field-level errors for part of a batch.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store answered with a success=false envelope or the transport
    /// gave up entirely.
    #[error("remote store failure: {0}")]
    Remote(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<crate::store::StoreError> for ServiceError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Remote(message) => ServiceError::Remote(message),
        }
    }
}
