//! TTL Policy Module
//!
//! Per-method cache lifespans, fixed at construction.

use std::collections::HashMap;

/// Lifespan used when a method has no entry of its own.
pub const DEFAULT_TTL_SECS: u64 = 1800;

// == Ttl Policy ==
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default_ttl: u64,
    per_method: HashMap<String, u64>,
}

impl TtlPolicy {
    pub fn new(default_ttl: u64) -> Self {
        Self {
            default_ttl,
            per_method: HashMap::new(),
        }
    }

    /// Sets the lifespan for `method`. A zero lifespan counts as unset.
    pub fn with_method(mut self, method: impl Into<String>, ttl_secs: u64) -> Self {
        self.per_method.insert(method.into(), ttl_secs);
        self
    }

    // == Lookup ==
    pub fn ttl_for(&self, method: &str) -> u64 {
        match self.per_method.get(method) {
            Some(&ttl) if ttl > 0 => ttl,
            _ => self.default_ttl,
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

/// Adds per-method entries, keeping the configured default.
impl<S: Into<String>> Extend<(S, u64)> for TtlPolicy {
    fn extend<I: IntoIterator<Item = (S, u64)>>(&mut self, iter: I) {
        for (method, ttl) in iter {
            self.per_method.insert(method.into(), ttl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for("get_by_params"), 1800);
        assert_eq!(policy.default_ttl(), 1800);
    }

    #[test]
    fn test_configured_method() {
        let policy = TtlPolicy::new(60).with_method("get_by_params", 600);
        assert_eq!(policy.ttl_for("get_by_params"), 600);
        assert_eq!(policy.ttl_for("select"), 60);
    }

    #[test]
    fn test_zero_entry_falls_back() {
        let policy = TtlPolicy::default().with_method("get_by_params", 0);
        assert_eq!(policy.ttl_for("get_by_params"), DEFAULT_TTL_SECS);
    }

    #[test]
    fn test_extend_keeps_default() {
        let mut policy = TtlPolicy::new(90);
        policy.extend(vec![("a", 5), ("b", 7)]);
        assert_eq!(policy.ttl_for("a"), 5);
        assert_eq!(policy.ttl_for("b"), 7);
        assert_eq!(policy.ttl_for("c"), 90);
    }
}
