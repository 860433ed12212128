//! In-process velocity store
//!
//! Mirrors the Redis key semantics (counters, scored collections, sets, whole
//! key expiry) on a `DashMap`. Expiry is evaluated lazily against the injected
//! clock, so tests can step through window boundaries. Keys nobody touches
//! again are reclaimed by a sweep that runs on a write at most once per
//! [`SWEEP_INTERVAL_SECS`]. Outages can be simulated with
//! [`InMemoryVelocityStore::set_available`].

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{ExpiryPolicy, StoreError, StoreResult, VelocityStore};
use crate::clock::{Clock, SystemClock};

/// Minimum spacing between full sweeps of expired keys
pub const SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone)]
enum StoredValue {
    Counter(i64),
    Scored(Vec<(f64, String)>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: StoredValue,
    /// Unix seconds at which the key disappears
    expires_at: Option<i64>,
}

impl StoredEntry {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// Velocity store kept in process memory
pub struct InMemoryVelocityStore {
    entries: DashMap<String, StoredEntry>,
    clock: Arc<dyn Clock>,
    expiry: ExpiryPolicy,
    available: AtomicBool,
    /// Unix seconds of the last sweep
    last_sweep: AtomicI64,
}

impl InMemoryVelocityStore {
    pub fn new(expiry: ExpiryPolicy) -> Self {
        Self::with_clock(Arc::new(SystemClock), expiry)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, expiry: ExpiryPolicy) -> Self {
        let now = clock.now().timestamp();
        Self {
            entries: DashMap::new(),
            clock,
            expiry,
            available: AtomicBool::new(true),
            last_sweep: AtomicI64::new(now),
        }
    }

    /// Toggle simulated reachability. While unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        let now = self.now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Number of stored keys, expired ones not yet reclaimed included
    pub fn stored_count(&self) -> usize {
        self.entries.len()
    }

    fn now(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Drop every expired key if the last sweep is old enough. Only one
    /// caller wins the swap, the rest skip.
    fn maybe_sweep(&self, now: i64) {
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now - last < SWEEP_INTERVAL_SECS {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "Swept expired velocity keys");
        }
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }

    /// Apply `write` to the live entry for `key`, creating it with `init` when
    /// absent or expired, then arm the TTL per the expiry policy.
    fn write<R>(
        &self,
        key: &str,
        ttl: Duration,
        init: impl Fn() -> StoredValue,
        write: impl FnOnce(&mut StoredValue) -> R,
    ) -> R {
        let now = self.now();
        // Must run before the entry guard below is taken
        self.maybe_sweep(now);

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredEntry {
                value: init(),
                expires_at: None,
            });

        // A dead key behaves as if it never existed
        let created = if entry.is_expired(now) {
            entry.value = init();
            entry.expires_at = None;
            true
        } else {
            entry.expires_at.is_none()
        };

        let result = write(&mut entry.value);

        if created || self.expiry == ExpiryPolicy::RefreshOnWrite {
            entry.expires_at = Some(now + ttl.as_secs() as i64);
        }

        result
    }

    fn read<R>(&self, key: &str, read: impl FnOnce(&StoredValue) -> R) -> Option<R> {
        let now = self.now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(read(&entry.value))
    }
}

impl Default for InMemoryVelocityStore {
    fn default() -> Self {
        Self::new(ExpiryPolicy::default())
    }
}

#[async_trait]
impl VelocityStore for InMemoryVelocityStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        self.check_available()?;
        Ok(self.write(
            key,
            ttl,
            || StoredValue::Counter(0),
            |value| match value {
                StoredValue::Counter(n) => {
                    *n += 1;
                    *n
                }
                other => {
                    *other = StoredValue::Counter(1);
                    1
                }
            },
        ))
    }

    async fn counter(&self, key: &str) -> StoreResult<i64> {
        self.check_available()?;
        Ok(self
            .read(key, |value| match value {
                StoredValue::Counter(n) => *n,
                _ => 0,
            })
            .unwrap_or(0))
    }

    async fn add_timed_entry(
        &self,
        key: &str,
        score: f64,
        member: &str,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.check_available()?;
        self.write(
            key,
            ttl,
            || StoredValue::Scored(Vec::new()),
            |value| {
                if !matches!(value, StoredValue::Scored(_)) {
                    *value = StoredValue::Scored(Vec::new());
                }
                if let StoredValue::Scored(items) = value {
                    // Sorted-set semantics: re-adding a member updates its score
                    items.retain(|(_, m)| m != member);
                    let pos = items.partition_point(|(s, _)| *s <= score);
                    items.insert(pos, (score, member.to_string()));
                }
            },
        );
        Ok(())
    }

    async fn range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self
            .read(key, |value| match value {
                StoredValue::Scored(items) => items
                    .iter()
                    .filter(|(s, _)| *s >= min && *s <= max)
                    .map(|(_, m)| m.clone())
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default())
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()> {
        self.check_available()?;
        self.write(
            key,
            ttl,
            || StoredValue::Set(HashSet::new()),
            |value| {
                if !matches!(value, StoredValue::Set(_)) {
                    *value = StoredValue::Set(HashSet::new());
                }
                if let StoredValue::Set(members) = value {
                    members.insert(member.to_string());
                }
            },
        );
        Ok(())
    }

    async fn set_cardinality(&self, key: &str) -> StoreResult<u64> {
        self.check_available()?;
        Ok(self
            .read(key, |value| match value {
                StoredValue::Set(members) => members.len() as u64,
                _ => 0,
            })
            .unwrap_or(0))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}
