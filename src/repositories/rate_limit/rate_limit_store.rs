//! 레이트 리밋 카운터 저장소
//!
//! 카운터 하나는 `(등급, 윈도우 종류, 클라이언트, 윈도우 시작)` 키로 식별됩니다.
//! 윈도우가 바뀌면 키가 바뀌므로 카운터를 초기화할 필요가 없고, 지난 키는 TTL로 사라집니다.
//!
//! - [`RedisRateLimitStore`] - 여러 인스턴스가 한도를 공유하는 운영 저장소 (`INCRBY` + `EXPIRE`)
//! - [`InMemoryRateLimitStore`] - 단일 프로세스용. `DashMap` 샤드와 원자적 카운터 사용

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::caching::redis::RedisClient;
use crate::errors::AppError;
use crate::utils::clock::Clock;

pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit:";

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// 카운터를 1 올리고 올린 뒤의 값을 반환합니다. 키는 `ttl` 뒤에 사라집니다.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u32, AppError>;

    /// 거부된 요청의 증가분을 되돌립니다. 0 아래로 내려가지 않습니다.
    async fn decrement(&self, key: &str, ttl: Duration) -> Result<(), AppError>;

    /// 현재 값. 없는 키는 0입니다.
    async fn count(&self, key: &str) -> Result<u32, AppError>;

    /// 만료된 카운터를 지우고 지운 개수를 반환합니다. 저장소가 스스로 만료시키면 0입니다.
    fn prune_expired(&self) -> usize {
        0
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.num_seconds().max(1) as u64
}

pub struct RedisRateLimitStore {
    redis: RedisClient,
}

impl RedisRateLimitStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u32, AppError> {
        let count = self.redis.incr_with_expiry(key, 1, ttl_seconds(ttl)).await?;
        Ok(clamp_count(count))
    }

    async fn decrement(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        self.redis.incr_with_expiry(key, -1, ttl_seconds(ttl)).await?;
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u32, AppError> {
        let raw = self.redis.get_string(key).await?;
        Ok(raw
            .and_then(|value| value.parse::<i64>().ok())
            .map(clamp_count)
            .unwrap_or(0))
    }
}

struct WindowCounter {
    count: AtomicU32,
    expires_at: DateTime<Utc>,
}

impl WindowCounter {
    fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }
}

pub struct InMemoryRateLimitStore {
    counters: DashMap<String, WindowCounter>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimitStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u32, AppError> {
        if let Some(counter) = self.counters.get(key) {
            return Ok(counter.increment());
        }

        let counter = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| WindowCounter {
                count: AtomicU32::new(0),
                expires_at: self.clock.now() + ttl,
            });
        Ok(counter.increment())
    }

    async fn decrement(&self, key: &str, _ttl: Duration) -> Result<(), AppError> {
        if let Some(counter) = self.counters.get(key) {
            let _ = counter
                .count
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| value.checked_sub(1));
        }
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u32, AppError> {
        Ok(self
            .counters
            .get(key)
            .map(|counter| counter.count.load(Ordering::SeqCst))
            .unwrap_or(0))
    }

    fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.expires_at > now);
        before.saturating_sub(self.counters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;

    #[tokio::test]
    async fn test_increment_and_rollback() {
        let store = InMemoryRateLimitStore::new(Arc::new(ManualClock::starting_now()));
        let ttl = Duration::seconds(60);

        assert_eq!(store.increment("k", ttl).await.unwrap(), 1);
        assert_eq!(store.increment("k", ttl).await.unwrap(), 2);
        store.decrement("k", ttl).await.unwrap();
        assert_eq!(store.count("k").await.unwrap(), 1);

        store.decrement("k", ttl).await.unwrap();
        store.decrement("k", ttl).await.unwrap();
        assert_eq!(store.count("k").await.unwrap(), 0);
        assert_eq!(store.count("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_expired_uses_key_ttl() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = InMemoryRateLimitStore::new(clock.clone());
        store.increment("minute", Duration::seconds(60)).await.unwrap();
        store.increment("hour", Duration::seconds(3600)).await.unwrap();

        clock.advance(Duration::seconds(61));
        assert_eq!(store.prune_expired(), 1);
        assert_eq!(store.len(), 1);

        clock.advance(Duration::hours(1));
        assert_eq!(store.prune_expired(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryRateLimitStore::new(Arc::new(ManualClock::starting_now())));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("k", Duration::seconds(60)).await.unwrap() })
            })
            .collect();
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=64).collect::<Vec<u32>>());
        assert_eq!(store.count("k").await.unwrap(), 64);
    }

    #[test]
    fn test_clamp_count() {
        assert_eq!(clamp_count(-3), 0);
        assert_eq!(clamp_count(7), 7);
        assert_eq!(clamp_count(i64::MAX), u32::MAX);
    }
}
