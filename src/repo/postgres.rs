use log::{debug, trace};
use sqlx::postgres::PgPoolOptions;

use super::{Document, Error, sql_models};
use crate::{allocator, params, query, traits::DocumentStore, types};

/// Document store backed by PostgreSQL.
///
/// Documents live in a single table, keyed by collection, with their content in a
/// JSONB column. Counters live in their own table and are advanced inside the same
/// transaction that writes the document.
#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Wraps an existing pool, creating the schema if missing.
    pub async fn with_pool(pool: sqlx::PgPool) -> Result<Self, Error> {
        sql_models::schema_create(&pool).await?;
        debug!("database schema ready");

        Ok(Self { pool })
    }
}

/// Reads the generated identifier of a document.
fn document_uuid(doc: &Document) -> Result<uuid::Uuid, Error> {
    let id = doc
        .get(params::DOCUMENT_ID_FIELD)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::BadDocumentId("missing".to_owned()))?;

    uuid::Uuid::parse_str(id).map_err(|e| Error::BadDocumentId(e.to_string()))
}

impl DocumentStore for PgStore {
    async fn insert(
        &self,
        collection: &types::CollectionName,
        doc: Document,
    ) -> Result<Document, Error> {
        let id = document_uuid(&doc)?;
        sql_models::document_insert(&self.pool, collection, id, &doc).await?;
        Ok(doc)
    }

    async fn insert_sequenced(
        &self,
        collection: &types::CollectionName,
        mut doc: Document,
        seq: &allocator::AutoIncrement,
    ) -> Result<Document, Error> {
        let id = document_uuid(&doc)?;

        // Dropping the transaction without commit rolls back the counter as well
        let mut tx = self.pool.begin().await?;

        let value = sql_models::counter_next(&mut *tx, seq)
            .await
            .map_err(Error::counter_update)?;
        trace!("issued `{}.{}` = {}", collection, seq.field, value);

        doc.insert(seq.field.clone(), value.into());
        sql_models::document_insert(&mut *tx, collection, id, &doc).await?;

        tx.commit().await.map_err(|e| Error::counter_update(e.into()))?;

        Ok(doc)
    }

    async fn find(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, Error> {
        sql_models::documents_find(&self.pool, collection, filter, limit).await
    }

    async fn count(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
    ) -> Result<u64, Error> {
        sql_models::documents_count(&self.pool, collection, filter).await
    }

    async fn delete_by_ids(
        &self,
        collection: &types::CollectionName,
        ids: &[uuid::Uuid],
    ) -> Result<u64, Error> {
        sql_models::documents_delete(&self.pool, collection, ids).await
    }

    async fn ensure_unique(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<(), Error> {
        sql_models::unique_index_create(&self.pool, collection, field).await
    }

    async fn counter_last(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<Option<i64>, Error> {
        let record = sql_models::counter_find(&self.pool, collection, field).await?;
        Ok(record.map(|r| r.last_value))
    }

    async fn counter_reset(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<(), Error> {
        sql_models::counter_delete(&self.pool, collection, field).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
