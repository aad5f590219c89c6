//! 리프레시 토큰 발급과 회전
//!
//! 토큰 값은 32바이트 OS 난수입니다. 회전은 저장소의 조건부 쓰기에 의존하므로
//! 같은 값에 대한 동시 회전 중 하나만 새 토큰을 받습니다.
//! 저장소 장애는 그대로 호출자에게 전달되며 재로그인으로 이어집니다.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::entities::RefreshToken;
use crate::errors::AppError;
use crate::repositories::tokens::RefreshTokenRepository;
use crate::utils::clock::Clock;
use crate::utils::crypto::{fingerprint, random_token};

const TOKEN_BYTES: usize = 32;

pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { repository, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 새 리프레시 토큰을 생성하고 저장합니다.
    pub async fn create(&self, user_id: i64) -> Result<RefreshToken, AppError> {
        self.create_for_session(user_id, None).await
    }

    /// 로그인 세션에 묶인 리프레시 토큰을 생성합니다.
    pub async fn create_for_session(&self, user_id: i64, session_id: Option<String>) -> Result<RefreshToken, AppError> {
        let now = self.clock.now();
        let token = RefreshToken {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: user_id,
            token_value: random_token(TOKEN_BYTES),
            created_at: now,
            expires_at: now + self.ttl,
            rotated_at: None,
            session_id,
        };

        self.repository.insert(&token).await?;
        log::debug!("리프레시 토큰 생성: user_id={}, fp={}", user_id, fingerprint(&token.token_value));
        Ok(token)
    }

    /// 기존 토큰을 무효화하고 같은 소유자의 새 토큰을 반환합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::TokenNotFoundOrExpired` - 없거나, 만료됐거나, 이미 회전된 토큰
    /// * 저장소 에러 - 그대로 전달
    pub async fn rotate(&self, old_token_value: &str) -> Result<RefreshToken, AppError> {
        let old_token_value = old_token_value.trim();
        if old_token_value.is_empty() {
            return Err(AppError::TokenNotFoundOrExpired(
                "리프레시 토큰이 비어 있습니다".to_string(),
            ));
        }

        let now = self.clock.now();
        let Some(parent) = self.repository.mark_rotated_if_active(old_token_value, now).await? else {
            log::warn!("리프레시 토큰 회전 거부: fp={}", fingerprint(old_token_value));
            return Err(AppError::TokenNotFoundOrExpired(
                "유효하지 않거나 만료된 리프레시 토큰입니다".to_string(),
            ));
        };

        self.create_for_session(parent.owner_user_id, parent.session_id).await
    }

    /// 사용자의 모든 리프레시 토큰을 삭제합니다.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let deleted = self.repository.delete_all_for_user(user_id).await?;
        log::info!("리프레시 토큰 전체 폐기: user_id={}, count={}", user_id, deleted);
        Ok(deleted)
    }

    /// 한 로그인 세션의 리프레시 토큰을 삭제합니다.
    pub async fn revoke_for_session(&self, session_id: &str) -> Result<u64, AppError> {
        let deleted = self.repository.delete_for_session(session_id).await?;
        log::info!("세션 리프레시 토큰 폐기: session_id={}, count={}", session_id, deleted);
        Ok(deleted)
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.repository.delete_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tokens::InMemoryRefreshTokenRepository;
    use crate::utils::clock::{ManualClock, SystemClock};

    fn store(clock: Arc<dyn Clock>) -> (Arc<InMemoryRefreshTokenRepository>, RefreshTokenStore) {
        let repository = Arc::new(InMemoryRefreshTokenRepository::new());
        let store = RefreshTokenStore::new(repository.clone(), clock, Duration::days(7));
        (repository, store)
    }

    #[tokio::test]
    async fn test_create_and_rotate_once() {
        let (repository, store) = store(Arc::new(SystemClock));

        let r1 = store.create(1).await.unwrap();
        let r2 = store.rotate(&r1.token_value).await.unwrap();

        assert_eq!(r2.owner_user_id, 1);
        assert_eq!(r2.session_id, None);
        assert_ne!(r1.token_value, r2.token_value);
        assert!(repository.find_by_value(&r1.token_value).unwrap().is_rotated());
        assert!(matches!(
            store.rotate(&r1.token_value).await,
            Err(AppError::TokenNotFoundOrExpired(_))
        ));
        assert!(store.rotate(&r2.token_value).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotation_keeps_session_binding() {
        let (_, store) = store(Arc::new(SystemClock));

        let r1 = store.create_for_session(1, Some("s-1".to_string())).await.unwrap();
        let r2 = store.rotate(&r1.token_value).await.unwrap();

        assert_eq!(r2.session_id.as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn test_revoke_for_session_blocks_rotation() {
        let (_, store) = store(Arc::new(SystemClock));
        let r1 = store.create_for_session(1, Some("s-1".to_string())).await.unwrap();
        let other = store.create_for_session(1, Some("s-2".to_string())).await.unwrap();

        assert_eq!(store.revoke_for_session("s-1").await.unwrap(), 1);

        assert!(matches!(
            store.rotate(&r1.token_value).await,
            Err(AppError::TokenNotFoundOrExpired(_))
        ));
        assert!(store.rotate(&other.token_value).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_treated_as_missing() {
        let clock = Arc::new(ManualClock::starting_now());
        let (_, store) = store(clock.clone());
        let token = store.create(1).await.unwrap();

        clock.advance(Duration::days(7));

        assert!(matches!(
            store.rotate(&token.token_value).await,
            Err(AppError::TokenNotFoundOrExpired(_))
        ));
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_blank_values_fail() {
        let (_, store) = store(Arc::new(SystemClock));

        assert!(matches!(store.rotate("nope").await, Err(AppError::TokenNotFoundOrExpired(_))));
        assert!(matches!(store.rotate(" ").await, Err(AppError::TokenNotFoundOrExpired(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_has_single_winner() {
        let (_, store) = store(Arc::new(SystemClock));
        let store = Arc::new(store);
        let parent = store.create(1).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let value = parent.token_value.clone();
                tokio::spawn(async move { store.rotate(&value).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, AppError::TokenNotFoundOrExpired(_))),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let (_, store) = store(Arc::new(SystemClock));
        let a = store.create(1).await.unwrap();
        store.create(1).await.unwrap();
        store.create(2).await.unwrap();

        assert_eq!(store.revoke_all_for_user(1).await.unwrap(), 2);
        assert!(store.rotate(&a.token_value).await.is_err());
    }
}
