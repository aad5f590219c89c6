//! CSRF 토큰 저장소
//!
//! subject마다 값 하나만 유지합니다. 새로 발급하면 이전 값은 덮어써집니다.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::caching::redis::RedisClient;
use crate::errors::AppError;
use crate::utils::clock::Clock;

pub const CSRF_KEY_PREFIX: &str = "csrf_token:";

#[async_trait]
pub trait CsrfTokenStore: Send + Sync {
    async fn put(&self, subject: &str, value: &str, ttl: Duration) -> Result<(), AppError>;
    async fn get(&self, subject: &str) -> Result<Option<String>, AppError>;
    async fn remove(&self, subject: &str) -> Result<(), AppError>;
}

pub struct RedisCsrfTokenStore {
    redis: RedisClient,
}

impl RedisCsrfTokenStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    fn key(subject: &str) -> String {
        format!("{}{}", CSRF_KEY_PREFIX, subject)
    }
}

#[async_trait]
impl CsrfTokenStore for RedisCsrfTokenStore {
    async fn put(&self, subject: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let seconds = ttl.num_seconds().max(1) as u64;
        self.redis.set_string_with_expiry(&Self::key(subject), value, seconds).await?;
        Ok(())
    }

    async fn get(&self, subject: &str) -> Result<Option<String>, AppError> {
        Ok(self.redis.get_string(&Self::key(subject)).await?)
    }

    async fn remove(&self, subject: &str) -> Result<(), AppError> {
        Ok(self.redis.del(&Self::key(subject)).await?)
    }
}

/// 메모리 기반 구현 (개발/테스트용)
pub struct InMemoryCsrfTokenStore {
    tokens: RwLock<HashMap<String, (String, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCsrfTokenStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl CsrfTokenStore for InMemoryCsrfTokenStore {
    async fn put(&self, subject: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let expires_at = self.clock.now() + ttl;
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, subject: &str) -> Result<Option<String>, AppError> {
        let now = self.clock.now();
        Ok(self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn remove(&self, subject: &str) -> Result<(), AppError> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subject);
        Ok(())
    }
}
