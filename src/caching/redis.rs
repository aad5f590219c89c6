//! # Redis 클라이언트 구현
//!
//! 토큰 블랙리스트, CSRF 토큰, 레이트 리밋 카운터 저장에 사용하는 Redis 클라이언트를 제공합니다.
//!
//! ## 연결 관리
//!
//! `ConnectionManager`는 하나의 멀티플렉싱 연결을 공유하고, 연결이 끊기면
//! 다음 명령에서 재연결을 시도합니다. 끊긴 동안의 명령은 에러를 돌려주므로
//! 호출자(예: 블랙리스트 복합 저장소)가 대체 경로를 결정합니다.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Serialize;

/// Redis 클라이언트 래퍼
///
/// ## 사용 예제
///
/// ```rust,ignore
/// use crate::caching::redis::RedisClient;
///
/// let redis = RedisClient::connect("redis://localhost:6379").await?;
/// redis.set_string_with_expiry("csrf_token:u1", "value", 7200).await?;
/// let value = redis.get_string("csrf_token:u1").await?;
/// ```
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Redis 서버에 연결하고 PING으로 가용성을 확인합니다.
    ///
    /// ## 에러 케이스
    ///
    /// - 잘못된 URL 형식
    /// - Redis 서버에 연결할 수 없는 경우
    /// - 인증 실패
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        let redis = Self { manager };
        redis.ping().await?;

        log::info!("✅ Redis 연결 성공");
        Ok(redis)
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await
    }

    /// 값을 JSON으로 직렬화하여 TTL(초)과 함께 저장합니다.
    pub async fn set_with_expiry<T: Serialize>(&self, key: &str, value: &T, seconds: u64) -> Result<(), redis::RedisError> {
        let json = serde_json::to_string(value)
            .map_err(|e| redis::RedisError::from((redis::ErrorKind::TypeError, "Serialization failed", e.to_string())))?;
        self.set_string_with_expiry(key, &json, seconds).await
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<String>>(key).await
    }

    /// 문자열 값을 TTL(초)과 함께 저장합니다. TTL 0은 1초로 올립니다.
    pub async fn set_string_with_expiry(&self, key: &str, value: &str, seconds: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, seconds.max(1)).await
    }

    /// 정수 카운터에 `delta`를 더하고 TTL(초)을 갱신합니다. 두 명령은 MULTI/EXEC로 함께 실행됩니다.
    ///
    /// 더한 뒤의 값을 반환합니다. 없는 키는 0에서 시작합니다.
    pub async fn incr_with_expiry(&self, key: &str, delta: i64, seconds: u64) -> Result<i64, redis::RedisError> {
        let mut conn = self.manager.clone();
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, delta)
            .expire(key, seconds.max(1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.manager.clone();
        conn.exists::<_, bool>(key).await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, redis::RedisError> {
        let mut conn = self.manager.clone();
        conn.keys::<_, Vec<String>>(pattern).await
    }
}
