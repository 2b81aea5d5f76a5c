//! In-Memory Data Source
//!
//! A `DataSource` that keeps every entity table in process memory and
//! evaluates filter specs directly. Used by the server binary and tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RepoError, Result};
use crate::repository::{
    DataSource, Direction, EntityDescriptor, FetchMode, FilterSpec, Operator, Predicate, Record,
};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Record>,
    /// Highest id handed out or stored so far
    last_id: i64,
}

// == Memory Data Source ==
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists each record in order and returns their ids.
    pub async fn seed(
        &self,
        entity: &EntityDescriptor,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        for record in records {
            ids.push(self.persist(entity, record).await?);
        }
        Ok(ids)
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn find(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(entity.name())
            .and_then(|table| table.rows.get(&id))
            .cloned())
    }

    async fn find_one(&self, entity: &EntityDescriptor, criteria: &Record) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(entity.name()) else {
            return Ok(None);
        };

        Ok(table
            .rows
            .values()
            .find(|row| {
                criteria.iter().all(|(column, expected)| {
                    row.get(column)
                        .map(|actual| compare(actual, expected) == Some(Ordering::Equal))
                        .unwrap_or(false)
                })
            })
            .cloned())
    }

    async fn execute(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        _mode: FetchMode,
    ) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(entity.name()) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Record> = table
            .rows
            .values()
            .filter(|row| filter.predicates().all(|predicate| matches(row, predicate)))
            .collect();

        if let Some((column, direction)) = filter.ordering() {
            rows.sort_by(|a, b| {
                let ordering = order_nulls_first(a.get(column.as_str()), b.get(column.as_str()));
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let result: Vec<Record> = rows
            .into_iter()
            .skip(filter.offset_value().unwrap_or(0))
            .take(filter.limit_value().unwrap_or(usize::MAX))
            .cloned()
            .collect();

        debug!(entity = entity.name(), rows = result.len(), "query executed");
        Ok(result)
    }

    async fn count(&self, entity: &EntityDescriptor) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(entity.name())
            .map(|table| table.rows.len() as u64)
            .unwrap_or(0))
    }

    async fn persist(&self, entity: &EntityDescriptor, mut record: Record) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(entity.name().to_string()).or_default();

        let id = match entity.id_of(&record) {
            Some(id) => id,
            None => table.last_id + 1,
        };
        table.last_id = table.last_id.max(id);

        record.insert(entity.id_column().to_string(), Value::from(id));
        table.rows.insert(id, record);
        Ok(id)
    }

    async fn merge(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        values: &Record,
    ) -> Result<Option<i64>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(entity.name())
            .and_then(|table| table.rows.get_mut(&id))
        else {
            return Ok(None);
        };

        let id_column = entity.id_column().as_str();
        for (column, value) in values.iter().filter(|(column, _)| column.as_str() != id_column) {
            row.insert(column.clone(), value.clone());
        }
        Ok(Some(id))
    }

    async fn remove(&self, entity: &EntityDescriptor, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(entity.name())
            .map(|table| table.rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn execute_update(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        values: &Record,
    ) -> Result<u64> {
        if values.contains_key(entity.id_column().as_str()) {
            return Err(RepoError::DataAccess(format!(
                "column {} is the identifier and cannot be updated",
                entity.id_column()
            )));
        }

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(entity.name()) else {
            return Ok(0);
        };

        let mut changed = 0;
        for row in table.rows.values_mut() {
            if filter.predicates().all(|predicate| matches(row, predicate)) {
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
                changed += 1;
            }
        }

        Ok(changed)
    }
}

// == Predicate Evaluation ==
/// Orders two JSON scalars of the same kind; `None` for mixed kinds.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (integer(x), integer(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Exact value of an integral number; floats go through `f64`.
fn integer(number: &serde_json::Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn matches(row: &Record, predicate: &Predicate) -> bool {
    let actual = row
        .get(predicate.column.as_str())
        .filter(|value| !value.is_null());
    let Some(actual) = actual else {
        return predicate.operator == Operator::IsNull;
    };

    let ordering = compare(actual, &predicate.value);
    match predicate.operator {
        Operator::IsNull => false,
        Operator::IsNotNull => true,
        Operator::Eq => ordering == Some(Ordering::Equal),
        Operator::Neq => ordering != Some(Ordering::Equal),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Like => match (actual.as_str(), predicate.value.as_str()) {
            (Some(text), Some(pattern)) => like(text, pattern),
            _ => false,
        },
        Operator::In => predicate
            .value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .any(|item| compare(actual, item) == Some(Ordering::Equal))
            })
            .unwrap_or(false),
    }
}

fn order_nulls_first(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

/// SQL LIKE: `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    // matched[j]: the pattern consumed so far matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for pc in pattern.chars() {
        let mut next = vec![false; text.len() + 1];
        if pc == '%' {
            let mut reachable = false;
            for j in 0..=text.len() {
                reachable |= matched[j];
                next[j] = reachable;
            }
        } else {
            for j in 1..=text.len() {
                next[j] = matched[j - 1] && (pc == '_' || pc == text[j - 1]);
            }
        }
        matched = next;
    }

    matched[text.len()]
}
