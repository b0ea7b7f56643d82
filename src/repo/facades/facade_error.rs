use crate::{query, repo, types};

/// Errors surfaced by the data access layer.
#[derive(thiserror::Error, Debug)]
pub enum FacadeError {
    #[error("connection error :: {0}")]
    ConnectionError(#[source] repo::Error),
    #[error("missing required field `{0}`")]
    ValidationError(String),
    #[error("store error :: {0}")]
    StoreError(#[source] repo::Error),
    #[error("allocation error :: {0}")]
    AllocationError(#[source] repo::Error),
    #[error("query error :: {0}")]
    QueryError(#[from] query::Error),
    #[error("data serialization error :: {0}")]
    DataSerializationError(#[from] serde_json::Error),
    #[error("collection name error :: {0}")]
    CollectionNameError(#[from] types::CollectionNameError),
}

impl From<repo::Error> for FacadeError {
    fn from(e: repo::Error) -> Self {
        if e.is_unreachable() {
            return Self::ConnectionError(e);
        }

        match e {
            repo::Error::CounterUpdate(_) | repo::Error::Allocator(_) => Self::AllocationError(e),
            repo::Error::Query(e) => Self::QueryError(e),
            e => Self::StoreError(e),
        }
    }
}
