//! Repository Module
//!
//! Generic entity persistence: filter specs, the data-source seam, an
//! in-memory source and the cached CRUD repository.

mod entity_repo;
mod filter;
mod memory;
mod source;

pub use entity_repo::{EntityRepository, GET_BY_PARAMS};
pub use filter::{Clause, Column, Direction, FilterSpec, Operator, Predicate};
pub use memory::MemoryDataSource;
pub use source::{DataSource, EntityDescriptor, FetchMode, Record};
