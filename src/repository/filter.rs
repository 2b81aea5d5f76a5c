//! Filter Specification Module
//!
//! Typed, validated description of a query: predicates combined with AND,
//! ordering and pagination.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::CanonicalArg;
use crate::error::{RepoError, Result};

// == Column ==
/// A validated column identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Column(String);

impl Column {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(Self(name))
        } else {
            Err(RepoError::InvalidFilter(format!(
                "'{}' is not a valid column name",
                name
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Operator ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// SQL LIKE with `%` and `_` wildcards
    Like,
    /// Value must be an array
    In,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn parse(name: &str) -> Result<Self> {
        let op = match name {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "like" => Self::Like,
            "in" => Self::In,
            "isNull" => Self::IsNull,
            "isNotNull" => Self::IsNotNull,
            other => {
                return Err(RepoError::InvalidFilter(format!(
                    "unknown operator '{}'",
                    other
                )))
            }
        };
        Ok(op)
    }

    /// Whether the operator compares against a value at all.
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

// == Direction ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Case-insensitive `ASC` / `DESC`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(RepoError::InvalidFilter(format!(
                "orientation must be ASC or DESC, got '{}'",
                name
            ))),
        }
    }
}

// == Predicate ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub column: Column,
    pub operator: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: Column, operator: Operator, value: Value) -> Result<Self> {
        match operator {
            Operator::In if !value.is_array() => Err(RepoError::InvalidFilter(format!(
                "'in' on {} needs an array value",
                column
            ))),
            Operator::Like if !value.is_string() => Err(RepoError::InvalidFilter(format!(
                "'like' on {} needs a string pattern",
                column
            ))),
            Operator::IsNull | Operator::IsNotNull => Ok(Self {
                column,
                operator,
                value: Value::Null,
            }),
            _ => Ok(Self {
                column,
                operator,
                value,
            }),
        }
    }
}

// == Clause ==
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Limit(usize),
    Offset(usize),
    OrderBy { column: Column, direction: Direction },
    Predicate(Predicate),
}

impl Clause {
    fn is_control(&self) -> bool {
        !matches!(self, Clause::Predicate(_))
    }
}

// == Filter Spec ==
/// Ordered clause list. Limit, offset and ordering appear at most once;
/// setting one again replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    clauses: Vec<Clause>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        let same_kind = std::mem::discriminant(&clause);
        if clause.is_control() {
            self.clauses
                .retain(|existing| std::mem::discriminant(existing) != same_kind);
        }
        self.clauses.push(clause);
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.push(clause);
        self
    }

    pub fn limit(self, count: usize) -> Self {
        self.with(Clause::Limit(count))
    }

    pub fn offset(self, count: usize) -> Self {
        self.with(Clause::Offset(count))
    }

    pub fn order_by(self, column: &str, direction: Direction) -> Result<Self> {
        let column = Column::new(column)?;
        Ok(self.with(Clause::OrderBy { column, direction }))
    }

    /// Adds an AND-ed predicate on `column`.
    pub fn filter(self, column: &str, operator: Operator, value: Value) -> Result<Self> {
        let predicate = Predicate::new(Column::new(column)?, operator, value)?;
        Ok(self.with(Clause::Predicate(predicate)))
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.clauses.iter().find_map(|clause| match clause {
            Clause::Limit(count) => Some(*count),
            _ => None,
        })
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.clauses.iter().find_map(|clause| match clause {
            Clause::Offset(count) => Some(*count),
            _ => None,
        })
    }

    pub fn ordering(&self) -> Option<(&Column, Direction)> {
        self.clauses.iter().find_map(|clause| match clause {
            Clause::OrderBy { column, direction } => Some((column, *direction)),
            _ => None,
        })
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.clauses.iter().filter_map(|clause| match clause {
            Clause::Predicate(predicate) => Some(predicate),
            _ => None,
        })
    }

    /// True when the spec holds no limit, offset or ordering.
    pub fn predicates_only(&self) -> bool {
        !self.clauses.iter().any(Clause::is_control)
    }

    // == Parse ==
    /// Parses the mapping form:
    /// `{"limit": 10, "order": {"column": "c", "orientation": "ASC"},
    ///   "status": {"operator": "eq", "value": "active"}}`.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut spec = Self::new();

        for (key, param) in map {
            let clause = match key.as_str() {
                "limit" => Clause::Limit(parse_count(key, param)?),
                "offset" => Clause::Offset(parse_count(key, param)?),
                "order" => parse_order(param)?,
                column => Clause::Predicate(parse_predicate(column, param)?),
            };
            spec.push(clause);
        }

        Ok(spec)
    }
}

fn parse_count(key: &str, param: &Value) -> Result<usize> {
    param
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| RepoError::InvalidFilter(format!("{} must be a non-negative integer", key)))
}

fn parse_order(param: &Value) -> Result<Clause> {
    let column = param
        .get("column")
        .and_then(Value::as_str)
        .ok_or_else(|| RepoError::InvalidFilter("order needs a column".to_string()))?;
    let direction = match param.get("orientation") {
        None | Some(Value::Null) => Direction::Asc,
        Some(Value::String(name)) => Direction::parse(name)?,
        Some(_) => {
            return Err(RepoError::InvalidFilter(
                "orientation must be a string".to_string(),
            ))
        }
    };

    Ok(Clause::OrderBy {
        column: Column::new(column)?,
        direction,
    })
}

fn parse_predicate(column: &str, param: &Value) -> Result<Predicate> {
    let column = Column::new(column)?;
    let operator = param
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| RepoError::InvalidFilter(format!("{} needs an operator", column)))
        .and_then(Operator::parse)?;

    let value = param.get("value").or_else(|| param.get("value1")).cloned();
    let value = match value {
        Some(value) => value,
        None if !operator.takes_value() => Value::Null,
        None => {
            return Err(RepoError::InvalidFilter(format!(
                "{} needs a value",
                column
            )))
        }
    };

    Predicate::new(column, operator, value)
}

impl TryFrom<&Value> for FilterSpec {
    type Error = RepoError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Ok(Self::new()),
            _ => Err(RepoError::InvalidFilter(
                "filter must be a JSON object".to_string(),
            )),
        }
    }
}

// == Canonical Form ==
// Clauses are sorted so builder order does not leak into cache keys.
impl CanonicalArg for FilterSpec {
    fn canonical_form(&self) -> String {
        let mut parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| serde_json::to_string(clause).unwrap_or_default())
            .collect();
        parts.sort();
        format!("[{}]", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_full_mapping() {
        let spec = FilterSpec::from_map(&map(json!({
            "status": {"operator": "eq", "value": "active"},
            "limit": 10,
            "offset": 5,
            "order": {"column": "name", "orientation": "desc"}
        })))
        .unwrap();

        assert_eq!(spec.limit_value(), Some(10));
        assert_eq!(spec.offset_value(), Some(5));
        let (column, direction) = spec.ordering().unwrap();
        assert_eq!(column.as_str(), "name");
        assert_eq!(direction, Direction::Desc);

        let predicates: Vec<_> = spec.predicates().collect();
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].operator, Operator::Eq);
        assert_eq!(predicates[0].value, json!("active"));
        assert!(!spec.predicates_only());
    }

    #[test]
    fn test_value1_alias() {
        let spec = FilterSpec::from_map(&map(json!({
            "age": {"operator": "gt", "value1": 30}
        })))
        .unwrap();
        assert_eq!(spec.predicates().next().unwrap().value, json!(30));
        assert!(spec.predicates_only());
    }

    #[test]
    fn test_rejects_invalid_input() {
        let cases = [
            json!({"limit": -1}),
            json!({"offset": "3"}),
            json!({"order": {"orientation": "ASC"}}),
            json!({"order": {"column": "x", "orientation": "UP"}}),
            json!({"bad-col": {"operator": "eq", "value": 1}}),
            json!({"x": {"operator": "between", "value": 1}}),
            json!({"x": {"value": 1}}),
            json!({"x": {"operator": "eq"}}),
            json!({"x": {"operator": "in", "value": 1}}),
            json!({"x": {"operator": "like", "value": 1}}),
        ];

        for case in cases {
            let result = FilterSpec::try_from(&case);
            assert!(
                matches!(result, Err(RepoError::InvalidFilter(_))),
                "expected rejection for {}",
                case
            );
        }
    }

    #[test]
    fn test_null_operator_needs_no_value() {
        let spec = FilterSpec::try_from(&json!({"deleted_at": {"operator": "isNull"}})).unwrap();
        assert_eq!(spec.predicates().next().unwrap().operator, Operator::IsNull);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(FilterSpec::try_from(&json!([1, 2])).is_err());
        assert!(FilterSpec::try_from(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_builder_replaces_control_clauses() {
        let spec = FilterSpec::new().limit(10).limit(20).offset(1);
        assert_eq!(spec.limit_value(), Some(20));
        assert_eq!(spec.clauses().len(), 2);
    }

    #[test]
    fn test_builder_validates_columns() {
        assert!(FilterSpec::new().filter("", Operator::Eq, json!(1)).is_err());
        assert!(FilterSpec::new().order_by("1abc", Direction::Asc).is_err());
        assert!(FilterSpec::new().filter("_ok1", Operator::Eq, json!(1)).is_ok());
    }

    #[test]
    fn test_canonical_form_ignores_builder_order() {
        let a = FilterSpec::new()
            .filter("status", Operator::Eq, json!("active"))
            .unwrap()
            .limit(10);
        let b = FilterSpec::new()
            .limit(10)
            .filter("status", Operator::Eq, json!("active"))
            .unwrap();
        assert_eq!(a.canonical_form(), b.canonical_form());

        let c = b.clone().limit(20);
        assert_ne!(a.canonical_form(), c.canonical_form());
    }

    #[test]
    fn test_canonical_form_matches_mapping() {
        let built = FilterSpec::new()
            .filter("status", Operator::Eq, json!("active"))
            .unwrap()
            .limit(10);
        let parsed = FilterSpec::try_from(&json!({
            "limit": 10,
            "status": {"operator": "eq", "value": "active"}
        }))
        .unwrap();
        assert_eq!(built.canonical_form(), parsed.canonical_form());
    }
}
