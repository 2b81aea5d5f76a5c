//! Configuration Module
//!
//! Loads server, cache and entity settings from environment variables.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::cache::{TtlPolicy, DEFAULT_TTL_SECS};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL in seconds for methods without their own entry
    pub default_ttl: u64,
    /// Per-method TTL overrides in seconds
    pub method_ttls: Vec<(String, u64)>,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Entity served by the HTTP API, also its route prefix
    pub entity_name: String,
    /// Identifier column of the entity
    pub id_column: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 1800)
    /// - `METHOD_TTLS` - Comma list of `method=seconds` (default: empty)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `ENTITY_NAME` - Entity name (default: records)
    /// - `ID_COLUMN` - Identifier column (default: id)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_parse("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: env_parse("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            method_ttls: env::var("METHOD_TTLS")
                .map(|raw| parse_method_ttls(&raw))
                .unwrap_or(defaults.method_ttls),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: env_parse("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            entity_name: env::var("ENTITY_NAME").unwrap_or(defaults.entity_name),
            id_column: env::var("ID_COLUMN").unwrap_or(defaults.id_column),
        }
    }

    /// Builds the cache TTL policy from the default and per-method settings.
    pub fn ttl_policy(&self) -> TtlPolicy {
        let mut policy = TtlPolicy::new(self.default_ttl);
        policy.extend(self.method_ttls.iter().cloned());
        policy
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Parses `method=secs,method=secs`, skipping malformed pairs.
fn parse_method_ttls(raw: &str) -> Vec<(String, u64)> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .and_then(|(method, secs)| {
                    let method = method.trim();
                    let secs = secs.trim().parse().ok()?;
                    (!method.is_empty()).then(|| (method.to_string(), secs))
                });
            if parsed.is_none() {
                warn!("Ignoring malformed METHOD_TTLS entry '{}'", pair);
            }
            parsed
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: DEFAULT_TTL_SECS,
            method_ttls: Vec::new(),
            server_port: 3000,
            cleanup_interval: 1,
            entity_name: "records".to_string(),
            id_column: "id".to_string(),
        }
    }
}
