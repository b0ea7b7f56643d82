use log::info;

use super::FacadeError;
use crate::{allocator, repo, traits::DocumentStore, types};

/// Facade over the auto-increment allocator of one collection.
pub struct FacadeAutoIncrement {
    repo: repo::Repository,
    collection: types::CollectionName,
}

impl FacadeAutoIncrement {
    pub fn new(repo: repo::Repository, collection: types::CollectionName) -> Self {
        Self { repo, collection }
    }

    /// Registers the allocator, moving it from unregistered to registered. Any
    /// previous registration of the same collection is replaced.
    pub async fn register(&self, start_at: i64, increment: i64) -> Result<(), FacadeError> {
        self.register_field(crate::params::DEFAULT_SEQUENCE_FIELD, start_at, increment)
            .await
    }

    pub async fn register_field(
        &self,
        field: &str,
        start_at: i64,
        increment: i64,
    ) -> Result<(), FacadeError> {
        let seq = allocator::AutoIncrement::new(self.collection.clone())
            .with_field(field)
            .with_start_at(start_at)
            .with_increment(increment);

        self.repo.register_sequence(seq).await?;
        info!(
            "auto-increment registered on `{}.{}`",
            self.collection, field
        );
        Ok(())
    }

    pub async fn state(&self) -> Result<allocator::AllocatorState, FacadeError> {
        let Some(seq) = self.repo.sequence(&self.collection).await else {
            return Ok(allocator::AllocatorState::Unregistered);
        };

        let backend = self.repo.backend().await?;
        let last = backend.counter_last(&self.collection, &seq.field).await?;

        Ok(allocator::AllocatorState::Registered {
            start_at: seq.start_at,
            increment: seq.increment,
            last,
        })
    }

    /// Returns the value the next insert will receive, without consuming it.
    /// [`None`] if the allocator is not registered.
    pub async fn next_count(&self) -> Result<Option<i64>, FacadeError> {
        let Some(seq) = self.repo.sequence(&self.collection).await else {
            return Ok(None);
        };

        let backend = self.repo.backend().await?;
        let last = backend.counter_last(&self.collection, &seq.field).await?;

        let next = seq.next_after(last).map_err(repo::Error::from)?;
        Ok(Some(next))
    }

    /// Restarts the counter, the next insert receives the start value again.
    ///
    /// The sequence field stays unique: resetting a collection that still holds
    /// documents makes the next inserts fail with a duplicate key.
    pub async fn reset_count(&self) -> Result<(), FacadeError> {
        let Some(seq) = self.repo.sequence(&self.collection).await else {
            return Ok(());
        };

        let backend = self.repo.backend().await?;
        backend.counter_reset(&self.collection, &seq.field).await?;

        info!("auto-increment on `{}.{}` reset", self.collection, seq.field);
        Ok(())
    }
}
