//! Velocity store adapter
//!
//! A narrow contract over an external key-value store with TTLs. The velocity
//! tracker is written against [`VelocityStore`] only; the concrete backend is
//! chosen at startup and injected.

mod memory;
mod redis_store;

pub use self::memory::InMemoryVelocityStore;
pub use self::redis_store::RedisVelocityStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Velocity store errors. Every variant means "the backend could not answer".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Velocity store unavailable: {0}")]
    Unavailable(String),

    #[error("Velocity store call timed out after {0}ms")]
    Timeout(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// When a key's TTL is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Every write re-arms the TTL, so a hot key keeps living
    #[default]
    RefreshOnWrite,
    /// Only the write that creates the key arms the TTL
    FixedFromFirstWrite,
}

impl ExpiryPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "refresh" | "refresh_on_write" => Some(ExpiryPolicy::RefreshOnWrite),
            "fixed" | "fixed_from_first_write" => Some(ExpiryPolicy::FixedFromFirstWrite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryPolicy::RefreshOnWrite => "refresh",
            ExpiryPolicy::FixedFromFirstWrite => "fixed",
        }
    }
}

/// Capability set the velocity tracker needs from its backing store.
///
/// Single-key operations are expected to be atomic; nothing here spans keys.
#[async_trait]
pub trait VelocityStore: Send + Sync {
    /// Short backend name for logs and status endpoints
    fn backend(&self) -> &'static str;

    /// Atomically increment a counter and arm its expiry
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64>;

    /// Current counter value, 0 if the key does not exist
    async fn counter(&self, key: &str) -> StoreResult<i64>;

    /// Insert `member` into a time-scored collection and arm its expiry
    async fn add_timed_entry(
        &self,
        key: &str,
        score: f64,
        member: &str,
        ttl: Duration,
    ) -> StoreResult<()>;

    /// Members with `min <= score <= max`, in score order
    async fn range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>>;

    /// Add `member` to a set and arm its expiry
    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()>;

    /// Number of members in a set, 0 if the key does not exist
    async fn set_cardinality(&self, key: &str) -> StoreResult<u64>;

    /// Liveness probe
    async fn ping(&self) -> StoreResult<()>;
}

/// Store used when no backend is reachable. Every call fails with
/// [`StoreError::Unavailable`], which the tracker turns into zero velocity risk.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> StoreResult<T> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

impl Default for UnavailableStore {
    fn default() -> Self {
        Self::new("velocity store disabled")
    }
}

#[async_trait]
impl VelocityStore for UnavailableStore {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn increment_with_expiry(&self, _key: &str, _ttl: Duration) -> StoreResult<i64> {
        self.err()
    }

    async fn counter(&self, _key: &str) -> StoreResult<i64> {
        self.err()
    }

    async fn add_timed_entry(
        &self,
        _key: &str,
        _score: f64,
        _member: &str,
        _ttl: Duration,
    ) -> StoreResult<()> {
        self.err()
    }

    async fn range_by_score(&self, _key: &str, _min: f64, _max: f64) -> StoreResult<Vec<String>> {
        self.err()
    }

    async fn add_to_set(&self, _key: &str, _member: &str, _ttl: Duration) -> StoreResult<()> {
        self.err()
    }

    async fn set_cardinality(&self, _key: &str) -> StoreResult<u64> {
        self.err()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.err()
    }
}
