//! Cache Key Module
//!
//! Derives deterministic cache keys from a call signature: the owning scope,
//! the method name and the canonical form of every argument.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a key (128 bits).
const KEY_DIGEST_BYTES: usize = 16;

// == Canonical Arg ==
/// Explicit normalization contract for anything used as a cache-key argument.
///
/// Implementations must be total and canonical: equal values always render
/// the same text, whatever order their fields were built in.
pub trait CanonicalArg: Sync {
    fn canonical_form(&self) -> String;
}

impl CanonicalArg for str {
    fn canonical_form(&self) -> String {
        self.to_string()
    }
}

impl CanonicalArg for String {
    fn canonical_form(&self) -> String {
        self.clone()
    }
}

impl CanonicalArg for bool {
    fn canonical_form(&self) -> String {
        let flag = if *self { "1" } else { "0" };
        flag.to_string()
    }
}

macro_rules! canonical_display {
    ($($ty:ty),*) => {
        $(impl CanonicalArg for $ty {
            fn canonical_form(&self) -> String {
                self.to_string()
            }
        })*
    };
}

canonical_display!(i32, i64, u32, u64, usize);

impl<T: CanonicalArg> CanonicalArg for Option<T> {
    fn canonical_form(&self) -> String {
        self.as_ref().map(T::canonical_form).unwrap_or_default()
    }
}

impl<T: CanonicalArg + ?Sized> CanonicalArg for &T {
    fn canonical_form(&self) -> String {
        (**self).canonical_form()
    }
}

// serde_json maps keep keys sorted, so structured values serialize canonically.
impl CanonicalArg for Value {
    fn canonical_form(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl CanonicalArg for Map<String, Value> {
    fn canonical_form(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// == Cache Key ==
/// Hex-encoded 128-bit digest identifying one cached call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    // == Compute ==
    /// `hash(scope + "_" + method + "_" + join(args, "_"))`
    pub fn compute(scope: &str, method: &str, args: &[&dyn CanonicalArg]) -> Self {
        Self::from_raw(&Self::raw(scope, method, args))
    }

    /// The pre-hash key text, useful when tracing why two calls collide.
    pub fn raw(scope: &str, method: &str, args: &[&dyn CanonicalArg]) -> String {
        let joined = args
            .iter()
            .map(|arg| arg.canonical_form())
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_{}_{}", scope, method, joined)
    }

    /// Hashes already-assembled key text.
    pub fn from_raw(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        let hex = digest[..KEY_DIGEST_BYTES]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
