use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Document, Error};
use crate::{allocator, params, query, traits::DocumentStore, types};

/// Full content of an in-process store. This is also the layout of the JSON snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    /// Documents by collection, in insertion order
    #[serde(default)]
    collections: BTreeMap<String, Vec<Document>>,
    /// Last issued counter value, by collection and field
    #[serde(default)]
    counters: BTreeMap<String, BTreeMap<String, i64>>,
    /// Unique fields, by collection
    #[serde(default)]
    unique: BTreeMap<String, BTreeSet<String>>,
}

impl State {
    fn documents(&self, collection: &types::CollectionName) -> &[Document] {
        self.collections
            .get(collection.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fails if `doc` collides with an existing document on a unique field.
    fn check_unique(&self, collection: &types::CollectionName, doc: &Document) -> Result<(), Error> {
        let Some(fields) = self.unique.get(collection.as_str()) else {
            return Ok(());
        };

        for field in fields {
            let Some(value) = doc.get(field).filter(|v| !v.is_null()) else {
                continue;
            };

            if self
                .documents(collection)
                .iter()
                .any(|d| d.get(field) == Some(value))
            {
                return Err(Error::DuplicateKey {
                    collection: collection.to_string(),
                    key: format!("{field}: {value}"),
                });
            }
        }

        Ok(())
    }

    fn push(&mut self, collection: &types::CollectionName, doc: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    fn counter(&self, collection: &types::CollectionName, field: &str) -> Option<i64> {
        self.counters
            .get(collection.as_str())
            .and_then(|c| c.get(field))
            .copied()
    }
}

/// Document store living in the process memory.
///
/// When opened over a snapshot file, every write is first applied to a staged copy of
/// the state, the copy is written to disk, and only then it replaces the live state.
/// A failed snapshot write leaves the store untouched.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, volatile store
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            snapshot: None,
        }
    }

    /// Opens a store persisted to `path`, loading the snapshot if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("loading snapshot `{}`", path.display());
                serde_json::from_slice(&bytes)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("snapshot `{}` not found, starting empty", path.display());
                State::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot: Some(path),
        })
    }

    /// Applies `f` to the state as a single atomic write.
    async fn commit<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut State) -> Result<R, Error>,
    {
        let mut state = self.state.lock().await;

        let Some(path) = &self.snapshot else {
            return f(&mut *state);
        };

        let mut staged = state.clone();
        let r = f(&mut staged)?;
        write_snapshot(path, &staged).await?;
        *state = staged;

        Ok(r)
    }
}

/// Writes the snapshot to a temporary file next to its final location, syncs it and
/// renames it in place. The temporary file is removed if any step fails.
async fn write_snapshot(path: &Path, state: &State) -> Result<(), Error> {
    let bytes = serde_json::to_vec(state)?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || persist_snapshot(&target, &bytes))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

    trace!("snapshot written to `{}`", path.display());
    Ok(())
}

fn persist_snapshot(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &types::CollectionName,
        doc: Document,
    ) -> Result<Document, Error> {
        self.commit(|state| {
            state.check_unique(collection, &doc)?;
            state.push(collection, doc.clone());
            Ok(doc)
        })
        .await
    }

    async fn insert_sequenced(
        &self,
        collection: &types::CollectionName,
        mut doc: Document,
        seq: &allocator::AutoIncrement,
    ) -> Result<Document, Error> {
        let res = self
            .commit(|state| {
                let value = seq.next_after(state.counter(collection, &seq.field))?;
                doc.insert(seq.field.clone(), value.into());

                state.check_unique(collection, &doc)?;

                state
                    .counters
                    .entry(collection.to_string())
                    .or_default()
                    .insert(seq.field.clone(), value);
                state.push(collection, doc.clone());

                Ok(doc)
            })
            .await;

        // With a snapshot the counter and the document are persisted by the same write
        res.map_err(|e| match e {
            Error::Io(_) => Error::counter_update(e),
            e => e,
        })
    }

    async fn find(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, Error> {
        let state = self.state.lock().await;
        let found = state
            .documents(collection)
            .iter()
            .filter(|d| filter.matches(d))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(found)
    }

    async fn count(
        &self,
        collection: &types::CollectionName,
        filter: &query::Filter,
    ) -> Result<u64, Error> {
        let state = self.state.lock().await;
        let count = state
            .documents(collection)
            .iter()
            .filter(|d| filter.matches(d))
            .count();
        Ok(count as u64)
    }

    async fn delete_by_ids(
        &self,
        collection: &types::CollectionName,
        ids: &[uuid::Uuid],
    ) -> Result<u64, Error> {
        let ids: BTreeSet<String> = ids.iter().map(uuid::Uuid::to_string).collect();

        self.commit(|state| {
            let Some(docs) = state.collections.get_mut(collection.as_str()) else {
                return Ok(0);
            };

            let before = docs.len();
            docs.retain(|d| {
                d.get(params::DOCUMENT_ID_FIELD)
                    .and_then(serde_json::Value::as_str)
                    .is_none_or(|id| !ids.contains(id))
            });
            Ok((before - docs.len()) as u64)
        })
        .await
    }

    async fn ensure_unique(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<(), Error> {
        query::validate_field(field)?;

        self.commit(|state| {
            let mut seen = BTreeSet::new();
            for value in state
                .documents(collection)
                .iter()
                .filter_map(|d| d.get(field))
                .filter(|v| !v.is_null())
            {
                if !seen.insert(value.to_string()) {
                    return Err(Error::DuplicateKey {
                        collection: collection.to_string(),
                        key: format!("{field}: {value}"),
                    });
                }
            }

            state
                .unique
                .entry(collection.to_string())
                .or_default()
                .insert(field.to_owned());
            Ok(())
        })
        .await
    }

    async fn counter_last(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<Option<i64>, Error> {
        Ok(self.state.lock().await.counter(collection, field))
    }

    async fn counter_reset(
        &self,
        collection: &types::CollectionName,
        field: &str,
    ) -> Result<(), Error> {
        self.commit(|state| {
            if let Some(counters) = state.counters.get_mut(collection.as_str()) {
                counters.remove(field);
            }
            Ok(())
        })
        .await
    }

    async fn close(&self) {}
}
