//! 토큰 폐기(블랙리스트) 저장소
//!
//! `RevocationStore`는 만료 시간이 있는 키 집합입니다. 구현은 세 가지입니다.
//!
//! - [`RedisRevocationStore`] - 주 저장소. 키는 `blacklist_token:{sha256(token)}`
//! - [`InMemoryRevocationStore`] - 프로세스 수명 동안만 유지되는 대체 저장소
//! - [`FallbackRevocationStore`] - 주 저장소를 먼저 쓰고, 실패하면 대체 저장소로 내려가는 복합 저장소
//!
//! 복합 저장소는 주 저장소 쓰기가 성공해도 대체 저장소에 사본을 남깁니다.
//! 폐기 직후 주 저장소가 내려가도 같은 프로세스에서는 폐기 사실이 유지됩니다.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::caching::redis::RedisClient;
use crate::errors::AppError;
use crate::utils::clock::Clock;
use crate::utils::crypto::sha256_hex;

pub const BLACKLIST_KEY_PREFIX: &str = "blacklist_token:";

/// 토큰 원문 대신 해시로 만든 블랙리스트 키
pub fn blacklist_key(token: &str) -> String {
    format!("{}{}", BLACKLIST_KEY_PREFIX, sha256_hex(token))
}

/// 만료 시간이 있는 폐기 키 저장소
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), AppError>;
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// 현재 살아 있는 키 개수
    async fn count(&self) -> Result<usize, AppError>;
}

/// Redis에 저장되는 블랙리스트 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlacklistEntry {
    revoked_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct RedisRevocationStore {
    redis: RedisClient,
    clock: Arc<dyn Clock>,
}

impl RedisRevocationStore {
    pub fn new(redis: RedisClient, clock: Arc<dyn Clock>) -> Self {
        Self { redis, clock }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        let now = self.clock.now();
        let entry = BlacklistEntry {
            revoked_at: now,
            expires_at: now + ttl,
        };
        let seconds = ttl.num_seconds().max(1) as u64;
        self.redis.set_with_expiry(key, &entry, seconds).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.redis.exists(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        Ok(self.redis.del(key).await?)
    }

    async fn count(&self) -> Result<usize, AppError> {
        let keys = self.redis.keys(&format!("{}*", BLACKLIST_KEY_PREFIX)).await?;
        Ok(keys.len())
    }
}

#[derive(Debug, Clone, Copy)]
struct MemoryEntry {
    expires_at: DateTime<Utc>,
    /// 주 저장소에도 기록된 사본인지 여부
    mirrored: bool,
}

/// 프로세스 메모리 기반 폐기 저장소
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn insert(&self, key: &str, ttl: Duration, mirrored: bool) {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert(MemoryEntry { expires_at, mirrored });
        // 더 긴 TTL과 "주 저장소에 없음" 상태를 우선합니다
        entry.expires_at = entry.expires_at.max(expires_at);
        entry.mirrored = entry.mirrored && mirrored;
    }

    fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }

    fn remove(&self, key: &str) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key);
    }

    fn live_count(&self, only_unmirrored: bool) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.expires_at > now && (!only_unmirrored || !entry.mirrored))
            .count()
    }

    /// 만료된 항목을 제거하고 제거한 개수를 반환합니다.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        self.insert(key, ttl, false);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.contains(key))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.remove(key);
        Ok(())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.live_count(false))
    }
}

/// 주 저장소 + 메모리 대체 저장소 복합 구현
///
/// 어느 쪽이든 "존재"라고 답하면 폐기된 것으로 봅니다.
/// 주 저장소 에러는 호출자에게 전달되지 않고 경고 로그만 남깁니다.
pub struct FallbackRevocationStore {
    primary: Arc<dyn RevocationStore>,
    fallback: Arc<InMemoryRevocationStore>,
}

impl FallbackRevocationStore {
    pub fn new(primary: Arc<dyn RevocationStore>, fallback: Arc<InMemoryRevocationStore>) -> Self {
        Self { primary, fallback }
    }

    pub fn fallback(&self) -> &InMemoryRevocationStore {
        &self.fallback
    }
}

#[async_trait]
impl RevocationStore for FallbackRevocationStore {
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        match self.primary.set(key, ttl).await {
            Ok(()) => self.fallback.insert(key, ttl, true),
            Err(e) => {
                log::warn!("블랙리스트 주 저장소 쓰기 실패, 메모리 저장소로 대체: {}", e);
                self.fallback.insert(key, ttl, false);
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        match self.primary.exists(key).await {
            Ok(true) => Ok(true),
            Ok(false) => Ok(self.fallback.contains(key)),
            Err(e) => {
                log::warn!("블랙리스트 주 저장소 조회 실패, 메모리 저장소 확인: {}", e);
                Ok(self.fallback.contains(key))
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        if let Err(e) = self.primary.delete(key).await {
            log::warn!("블랙리스트 주 저장소 삭제 실패: {}", e);
        }
        self.fallback.remove(key);
        Ok(())
    }

    async fn count(&self) -> Result<usize, AppError> {
        match self.primary.count().await {
            Ok(primary) => Ok(primary + self.fallback.live_count(true)),
            Err(e) => {
                log::warn!("블랙리스트 주 저장소 집계 실패: {}", e);
                Ok(self.fallback.live_count(false))
            }
        }
    }
}
