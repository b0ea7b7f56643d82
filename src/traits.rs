//! Capability interfaces shared across modules.

use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;

use crate::{allocator, query, repo, types};

/// A record type that can be persisted through the repository.
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// Logical entity name, the collection name is derived from it
    const ENTITY: &'static str;

    /// Fields that must be present (and non-empty, for strings) before a write
    const REQUIRED_FIELDS: &'static [&'static str] = &[];
}

/// Operations a document store backend must provide.
///
/// Documents handed to [`DocumentStore::insert`] and [`DocumentStore::insert_sequenced`]
/// already carry their generated identifier. Every write is atomic: either it is fully
/// applied or the store is left unchanged.
pub trait DocumentStore: Send + Sync {
    /// Writes a document, returning it as persisted.
    fn insert(
        &self,
        collection: &types::CollectionName,
        doc: repo::Document,
    ) -> impl Future<Output = Result<repo::Document, repo::Error>> + Send;

    /// Advances the counter described by `seq`, stores the issued value into the
    /// document and writes it, as a single unit.
    fn insert_sequenced(
        &self,
        collection: &types::CollectionName,
        doc: repo::Document,
        seq: &allocator::AutoIncrement,
    ) -> impl Future<Output = Result<repo::Document, repo::Error>> + Send;

    /// Returns the documents matching `filter` in insertion order, at most `limit` if provided.
    fn find(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<repo::Document>, repo::Error>> + Send;

    fn count(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
    ) -> impl Future<Output = Result<u64, repo::Error>> + Send;

    /// Removes documents by identifier, returns the number of removed documents.
    fn delete_by_ids(
        &self,
        collection: &types::CollectionName,
        ids: &[uuid::Uuid],
    ) -> impl Future<Output = Result<u64, repo::Error>> + Send;

    /// Declares `field` unique across `collection`.
    fn ensure_unique(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> impl Future<Output = Result<(), repo::Error>> + Send;

    /// Returns the last value issued by a counter, if any.
    fn counter_last(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> impl Future<Output = Result<Option<i64>, repo::Error>> + Send;

    /// Forgets a counter so that the next allocation restarts from its start value.
    fn counter_reset(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> impl Future<Output = Result<(), repo::Error>> + Send;

    fn close(&self) -> impl Future<Output = ()> + Send;
}
