//! Redis-backed velocity store
//!
//! Counters are plain keys, amount history is a sorted set scored by unix
//! seconds, recipients are a set. Writes go through MULTI/EXEC pipelines so
//! the write and its EXPIRE land together.

use ::redis::{aio::ConnectionManager, AsyncCommands, Client, Pipeline, RedisResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::{ExpiryPolicy, StoreError, StoreResult, VelocityStore};

/// First Redis major version accepting `EXPIRE key secs NX`
const MIN_EXPIRE_NX_MAJOR: u32 = 7;

/// Velocity store over a shared Redis connection manager
#[derive(Clone)]
pub struct RedisVelocityStore {
    conn: ConnectionManager,
    timeout: Duration,
    expiry: ExpiryPolicy,
}

impl RedisVelocityStore {
    /// Connect and verify the server answers PING within `timeout`.
    pub async fn connect(
        redis_url: &str,
        timeout: Duration,
        expiry: ExpiryPolicy,
    ) -> StoreResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {}", e)))?;

        let conn = match tokio::time::timeout(timeout, ConnectionManager::new(client)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StoreError::Unavailable(e.to_string())),
            Err(_) => return Err(StoreError::Timeout(timeout.as_millis() as u64)),
        };

        let store = Self {
            conn,
            timeout,
            expiry,
        };
        store.ping().await?;

        if expiry == ExpiryPolicy::FixedFromFirstWrite {
            store.require_expire_nx().await?;
        }

        tracing::debug!(expiry = store.expiry.as_str(), "Connected to Redis velocity store");
        Ok(store)
    }

    /// `EXPIRE .. NX` is rejected before Redis 7, which would make every
    /// record transaction fail. Refuse the connection up front instead.
    async fn require_expire_nx(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let info: String = self
            .bounded("INFO", async move {
                ::redis::cmd("INFO").arg("server").query_async(&mut conn).await
            })
            .await?;

        match server_major_version(&info) {
            Some(major) if major >= MIN_EXPIRE_NX_MAJOR => Ok(()),
            Some(major) => Err(StoreError::Unavailable(format!(
                "fixed expiry policy needs Redis {}+, server is {}.x",
                MIN_EXPIRE_NX_MAJOR, major
            ))),
            None => Err(StoreError::Unavailable(
                "could not read redis_version from INFO server".to_string(),
            )),
        }
    }

    /// Bound a Redis call by the configured timeout and map its error
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("{}: {}", op, e))),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Queue an EXPIRE for `key` honouring the expiry policy.
    /// `EXPIRE .. NX` needs Redis 7 or newer.
    fn queue_expire(&self, pipe: &mut Pipeline, key: &str, ttl: Duration) {
        let cmd = pipe.cmd("EXPIRE").arg(key).arg(ttl.as_secs());
        if self.expiry == ExpiryPolicy::FixedFromFirstWrite {
            cmd.arg("NX");
        }
        cmd.ignore();
    }
}

#[async_trait]
impl VelocityStore for RedisVelocityStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut pipe = ::redis::pipe();
        pipe.atomic().incr(key, 1);
        self.queue_expire(&mut pipe, key, ttl);

        let mut conn = self.conn.clone();
        let (count,): (i64,) = self
            .bounded("INCR", async move { pipe.query_async(&mut conn).await })
            .await?;
        Ok(count)
    }

    async fn counter(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let value: Option<i64> = self
            .bounded("GET", async move { conn.get(key).await })
            .await?;
        Ok(value.unwrap_or(0))
    }

    async fn add_timed_entry(
        &self,
        key: &str,
        score: f64,
        member: &str,
        ttl: Duration,
    ) -> StoreResult<()> {
        let mut pipe = ::redis::pipe();
        pipe.atomic().zadd(key, member, score).ignore();
        self.queue_expire(&mut pipe, key, ttl);

        let mut conn = self.conn.clone();
        self.bounded("ZADD", async move { pipe.query_async(&mut conn).await })
            .await
    }

    async fn range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let (min, max) = (score_bound(min), score_bound(max));
        self.bounded("ZRANGEBYSCORE", async move {
            conn.zrangebyscore(key, min, max).await
        })
        .await
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()> {
        let mut pipe = ::redis::pipe();
        pipe.atomic().sadd(key, member).ignore();
        self.queue_expire(&mut pipe, key, ttl);

        let mut conn = self.conn.clone();
        self.bounded("SADD", async move { pipe.query_async(&mut conn).await })
            .await
    }

    async fn set_cardinality(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        self.bounded("SCARD", async move { conn.scard(key).await })
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = self
            .bounded("PING", async move {
                ::redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }
}

/// Major version from the `redis_version:` line of `INFO server`
fn server_major_version(info: &str) -> Option<u32> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("redis_version:"))
        .and_then(|version| version.split('.').next())
        .and_then(|major| major.parse().ok())
}

/// Score bound in the form ZRANGEBYSCORE expects, with explicit infinities
fn score_bound(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}
