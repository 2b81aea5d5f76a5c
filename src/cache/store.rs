//! Cache Store Module
//!
//! In-process key-value store with per-entry TTL, lazy expiry and
//! least-recently-used eviction once capacity is reached.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{RepoError, Result};

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    /// Monotonic counter used to order entries by recency
    tick: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` entries, timed by the system clock.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_entries,
            clock,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_seconds`.
    ///
    /// An existing key is overwritten and its TTL reset. Inserting a new key
    /// into a full store evicts the least recently used entry first.
    pub fn set(&mut self, key: String, value: String, ttl_seconds: u64) -> Result<()> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(RepoError::InvalidRequest(format!(
                "Key must be between 1 and {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(RepoError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest()?;
        }

        let now = self.clock.now_ms();
        let tick = self.next_tick();
        self.entries
            .insert(key, CacheEntry::new(value, ttl_seconds, now, tick));
        self.stats.total_entries = self.entries.len();

        Ok(())
    }

    fn evict_oldest(&mut self) -> Result<()> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.record_eviction();
                Ok(())
            }
            None => Err(RepoError::CacheFull(
                "Cache is full and eviction failed".to_string(),
            )),
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and unexpired.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Result<String> {
        let now = self.clock.now_ms();
        let tick = self.next_tick();

        match self.entries.get_mut(key) {
            None => {
                self.stats.record_miss();
                return Err(RepoError::NotFound(key.to_string()));
            }
            Some(entry) if !entry.is_expired(now) => {
                entry.last_access = tick;
                let value = entry.value.clone();
                self.stats.record_hit();
                return Ok(value);
            }
            Some(_) => {}
        }

        self.remove_expired(key);
        self.stats.record_miss();
        Err(RepoError::Expired(key.to_string()))
    }

    // == Contains ==
    /// Presence check that leaves hit/miss counters untouched.
    pub fn contains(&mut self, key: &str) -> bool {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.remove_expired(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn remove_expired(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.stats.record_expirations(1);
            self.stats.total_entries = self.entries.len();
        }
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.stats.total_entries = self.entries.len();
            Ok(())
        } else {
            Err(RepoError::NotFound(key.to_string()))
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    // == Cleanup Expired ==
    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        self.stats.total_entries = self.entries.len();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
