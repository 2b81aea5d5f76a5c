//! Request DTOs for the repository API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::repository::Record;

/// Query string for `POST /{entity}/query`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    /// Fetch fully hydrated entities instead of plain arrays
    #[serde(default)]
    pub raw: bool,
}

/// Request body for `PATCH /{entity}/items`
///
/// # Fields
/// - `filter`: filter mapping, predicates only
/// - `data`: column values to write on every matching record
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateByParamsRequest {
    #[serde(default)]
    pub filter: Value,
    #[serde(default)]
    pub data: Record,
}

impl UpdateByParamsRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.data.is_empty() {
            return Some("Update data cannot be empty".to_string());
        }
        None
    }
}
