//! Cache Module
//!
//! Cache-key derivation, the read-through policy and an in-memory cache
//! store with TTL expiration and LRU eviction.

mod backend;
mod clock;
mod entry;
mod key;
mod read_through;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use backend::{CacheBackend, MemoryBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, CanonicalArg};
pub use read_through::ReadThroughCache;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use ttl::{TtlPolicy, DEFAULT_TTL_SECS};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
