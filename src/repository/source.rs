//! Data Source Module
//!
//! The data-access seam the repository delegates to. Query execution,
//! hydration and persistence all live behind `DataSource`.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{RepoError, Result};
use crate::repository::{Column, FilterSpec};

/// One row of an entity, keyed by column name.
pub type Record = Map<String, Value>;

// == Entity Descriptor ==
/// Identifies the entity a repository manages. Also used as the cache scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    id_column: Column,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Column::new(name.as_str()).map_err(|_| {
            RepoError::InvalidRequest(format!("'{}' is not a valid entity name", name))
        })?;

        Ok(Self {
            name,
            id_column: Column::new("id")?,
        })
    }

    pub fn with_id_column(mut self, column: &str) -> Result<Self> {
        self.id_column = Column::new(column)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_column(&self) -> &Column {
        &self.id_column
    }

    /// Reads the id of `record`, if it carries a positive integer one.
    pub fn id_of(&self, record: &Record) -> Option<i64> {
        record
            .get(self.id_column.as_str())
            .and_then(Value::as_i64)
            .filter(|id| *id > 0)
    }
}

// == Fetch Mode ==
/// How query rows are hydrated. Sources without distinct entity hydration
/// may treat both modes alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fully hydrated entities
    Entity,
    /// Plain column arrays
    Array,
}

// == Data Source ==
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn find(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Record>>;

    /// First record whose columns equal every entry of `criteria`.
    async fn find_one(&self, entity: &EntityDescriptor, criteria: &Record) -> Result<Option<Record>>;

    async fn execute(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        mode: FetchMode,
    ) -> Result<Vec<Record>>;

    async fn count(&self, entity: &EntityDescriptor) -> Result<u64>;

    /// Writes and flushes `record`. Without an id a new one is assigned;
    /// with one the stored record is replaced. Returns the record id.
    async fn persist(&self, entity: &EntityDescriptor, record: Record) -> Result<i64>;

    /// Copies `values` onto record `id` in one step, leaving the id column
    /// untouched. `None` when no record has that id; an absent record is
    /// never recreated.
    async fn merge(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        values: &Record,
    ) -> Result<Option<i64>>;

    /// Returns false when nothing had that id.
    async fn remove(&self, entity: &EntityDescriptor, id: i64) -> Result<bool>;

    /// Applies `values` to every record matching the filter's predicates.
    /// Returns the number of records changed.
    async fn execute_update(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        values: &Record,
    ) -> Result<u64>;
}
