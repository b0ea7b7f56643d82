//! # Auto-Increment Allocator
//!
//! An [`AutoIncrement`] binds a counter to one `(collection, field)` pair. Each insert
//! into the collection consumes one value: the first allocation returns `start_at`,
//! each following one returns the previous value plus `increment`.
//!
//! The counter itself (the last issued value) is owned and persisted by the store
//! backend, which advances it and writes the record as one unit. This module only
//! holds the registration data and the pure counter arithmetic.

use crate::{params, query, types};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("increment must be a positive value, got {0}")]
    BadIncrement(i64),
    #[error("counter `{collection}.{field}` overflowed")]
    Overflow { collection: String, field: String },
    #[error("bad sequence field :: {0}")]
    BadField(#[from] query::Error),
}

/// Registration of an auto-increment counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoIncrement {
    pub collection: types::CollectionName,
    pub field: String,
    pub start_at: i64,
    pub increment: i64,
}

impl AutoIncrement {
    pub fn new(collection: types::CollectionName) -> Self {
        Self {
            collection,
            field: params::DEFAULT_SEQUENCE_FIELD.to_owned(),
            start_at: params::DEFAULT_SEQUENCE_START,
            increment: params::DEFAULT_SEQUENCE_INCREMENT,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = field.to_owned();
        self
    }

    pub fn with_start_at(mut self, start_at: i64) -> Self {
        self.start_at = start_at;
        self
    }

    pub fn with_increment(mut self, increment: i64) -> Self {
        self.increment = increment;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.increment <= 0 {
            return Err(Error::BadIncrement(self.increment));
        }
        query::validate_field(&self.field)?;
        Ok(())
    }

    /// Computes the value issued after `last`.
    pub fn next_after(&self, last: Option<i64>) -> Result<i64, Error> {
        match last {
            None => Ok(self.start_at),
            Some(last) => last.checked_add(self.increment).ok_or_else(|| Error::Overflow {
                collection: self.collection.to_string(),
                field: self.field.clone(),
            }),
        }
    }
}

/// Observable state of the allocator of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatorState {
    Unregistered,
    Registered {
        start_at: i64,
        increment: i64,
        /// Last issued value, [`None`] until the first allocation
        last: Option<i64>,
    },
}
