use log::{debug, trace, warn};
use std::marker::PhantomData;

use super::FacadeError;
use crate::{
    params, query,
    repo::{self, Document},
    traits::{DocumentStore, Model},
    types,
};

/// Facade giving typed access to the collection of a [`Model`].
///
/// Records are converted to documents on the way in and back to records on the way out;
/// the facade checks required fields and hands inserts to the allocator when one is
/// registered for the collection.
pub struct FacadeModel<M: Model> {
    repo: repo::Repository,
    collection: types::CollectionName,
    _model: PhantomData<M>,
}

impl<M: Model> FacadeModel<M> {
    /// Binds the facade to the collection derived from [`Model::ENTITY`].
    pub fn new(repo: repo::Repository) -> Result<Self, FacadeError> {
        let collection = types::CollectionName::from_entity(M::ENTITY)?;
        Ok(Self::with_collection(repo, collection))
    }

    pub fn with_collection(repo: repo::Repository, collection: types::CollectionName) -> Self {
        Self {
            repo,
            collection,
            _model: PhantomData,
        }
    }

    pub fn collection(&self) -> &types::CollectionName {
        &self.collection
    }

    /// Persists a record and returns it as stored, with its generated identifier and,
    /// if an allocator is registered, its sequence value.
    pub async fn insert(&self, record: &M) -> Result<M, FacadeError> {
        let (_, persisted) = self.insert_with_id(record).await?;
        Ok(persisted)
    }

    async fn insert_with_id(&self, record: &M) -> Result<(uuid::Uuid, M), FacadeError> {
        let mut doc = into_document(record)?;
        validate_required::<M>(&doc)?;

        let id = uuid::Uuid::new_v4();
        doc.insert(params::DOCUMENT_ID_FIELD.to_owned(), id.to_string().into());

        let backend = self.repo.backend().await?;

        let doc = match self.repo.sequence(&self.collection).await {
            Some(seq) => backend.insert_sequenced(&self.collection, doc, &seq).await?,
            None => backend.insert(&self.collection, doc).await?,
        };

        trace!("inserted document {} into `{}`", id, self.collection);

        Ok((id, from_document(doc)?))
    }

    /// Inserts records one after the other. The first failure aborts the batch and
    /// removes the records already written by it.
    pub async fn insert_many(
        &self,
        records: impl IntoIterator<Item = M>,
    ) -> Result<Vec<M>, FacadeError> {
        let mut inserted: Vec<M> = Vec::new();
        let mut ids: Vec<uuid::Uuid> = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            match self.insert_with_id(&record).await {
                Ok((id, persisted)) => {
                    ids.push(id);
                    inserted.push(persisted);
                }
                Err(err) => {
                    warn!(
                        "batch insert into `{}` aborted at record #{}: {}",
                        self.collection, index, err
                    );
                    self.rollback(&ids).await;
                    return Err(err);
                }
            }
        }

        debug!(
            "batch inserted {} records into `{}`",
            inserted.len(),
            self.collection
        );

        Ok(inserted)
    }

    /// Removes the documents written by an aborted batch.
    async fn rollback(&self, ids: &[uuid::Uuid]) {
        if ids.is_empty() {
            return;
        }

        let res = match self.repo.backend().await {
            Ok(backend) => backend.delete_by_ids(&self.collection, ids).await,
            Err(e) => Err(e),
        };

        match res {
            Ok(n) => debug!("rolled back {} records from `{}`", n, self.collection),
            Err(e) => warn!(
                "unable to roll back {} records from `{}`: {}",
                ids.len(),
                self.collection,
                e
            ),
        }
    }

    /// Returns every record of the collection.
    pub async fn find_all(&self) -> Result<Vec<M>, FacadeError> {
        self.find(&query::Filter::new(), None).await
    }

    /// Returns the first record whose `field` equals `value`.
    pub async fn find_one_by_field(
        &self,
        field: &str,
        value: impl Into<query::Value>,
    ) -> Result<Option<M>, FacadeError> {
        let filter = query::Filter::new().eq(field, value)?;
        Ok(self.find(&filter, Some(1)).await?.into_iter().next())
    }

    /// Returns all records whose `field` equals `value`.
    pub async fn find_all_by_field(
        &self,
        field: &str,
        value: impl Into<query::Value>,
    ) -> Result<Vec<M>, FacadeError> {
        let filter = query::Filter::new().eq(field, value)?;
        self.find(&filter, None).await
    }

    /// Counts the records satisfying every constraint of `filter`.
    pub async fn count_in_range(&self, filter: &query::Filter) -> Result<u64, FacadeError> {
        let backend = self.repo.backend().await?;
        Ok(backend.count(&self.collection, filter).await?)
    }

    async fn find(
        &self,
        filter: &query::Filter,
        limit: Option<usize>,
    ) -> Result<Vec<M>, FacadeError> {
        let backend = self.repo.backend().await?;
        let docs = backend.find(&self.collection, filter, limit).await?;
        trace!("found {} documents in `{}`", docs.len(), self.collection);

        docs.into_iter().map(from_document).collect()
    }
}

fn into_document<M: Model>(record: &M) -> Result<Document, FacadeError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(doc) => Ok(doc),
        _ => Err(FacadeError::ValidationError(
            "<record is not a document>".to_owned(),
        )),
    }
}

fn from_document<M: Model>(doc: Document) -> Result<M, FacadeError> {
    Ok(serde_json::from_value(serde_json::Value::Object(doc))?)
}

/// Checks that every required field is present, not null and, for strings, not empty.
fn validate_required<M: Model>(doc: &Document) -> Result<(), FacadeError> {
    for field in M::REQUIRED_FIELDS {
        let present = match doc.get(*field) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };

        if !present {
            return Err(FacadeError::ValidationError((*field).to_owned()));
        }
    }
    Ok(())
}
