//! Entity Cache - generic CRUD repository with a read-through query cache
//!
//! Parameterized queries are cached under keys derived from the entity,
//! the method name and the canonical form of every argument.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheBackend, CacheKey, CanonicalArg, ReadThroughCache, TtlPolicy};
pub use config::Config;
pub use error::{RepoError, Result};
pub use repository::{DataSource, EntityDescriptor, EntityRepository, FilterSpec, Record};
pub use tasks::spawn_cleanup_task;
