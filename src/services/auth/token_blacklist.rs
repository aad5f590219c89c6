//! 액세스 토큰 블랙리스트
//!
//! 로그아웃/회원 탈퇴로 폐기된 토큰을 자연 만료 시점까지 거부합니다.
//! 항목 TTL은 토큰의 남은 수명이며, 만료 시각을 읽을 수 없으면 보수적인 대체 TTL을 씁니다.

use std::sync::Arc;

use chrono::Duration;

use crate::errors::AppError;
use crate::repositories::tokens::{blacklist_key, FallbackRevocationStore, RevocationStore};
use crate::services::auth::token_codec::TokenCodec;
use crate::utils::clock::Clock;
use crate::utils::crypto::fingerprint;

pub struct TokenBlacklist {
    store: Arc<dyn RevocationStore>,
    /// 대체 저장소 정리용 (복합 저장소를 쓸 때만)
    composite: Option<Arc<FallbackRevocationStore>>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    fallback_ttl: Duration,
}

impl TokenBlacklist {
    pub fn new(
        store: Arc<dyn RevocationStore>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            store,
            composite: None,
            codec,
            clock,
            fallback_ttl,
        }
    }

    /// 주 저장소 + 메모리 대체 저장소 구성
    pub fn with_fallback(
        store: Arc<FallbackRevocationStore>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            store: store.clone(),
            composite: Some(store),
            codec,
            clock,
            fallback_ttl,
        }
    }

    /// 토큰을 폐기합니다. 빈 입력은 아무 일도 하지 않습니다.
    ///
    /// # Errors
    ///
    /// 복합 저장소는 주 저장소 장애를 흡수하므로 보통 에러를 돌려주지 않습니다.
    /// 단일 저장소 구성에서는 저장소 에러가 그대로 전달됩니다.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }

        let ttl = self.ttl_for(token);
        self.store.set(&blacklist_key(token), ttl).await?;
        log::info!(
            "토큰 폐기: fp={}, ttl={}s",
            fingerprint(token),
            ttl.num_seconds()
        );
        Ok(())
    }

    /// 폐기된 토큰이면 `true`. 빈 입력은 저장소를 조회하지 않고 `false`입니다.
    pub async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(false);
        }
        self.store.exists(&blacklist_key(token)).await
    }

    /// 두 저장소에서 항목을 제거합니다. 멱등입니다.
    pub async fn unrevoke(&self, token: &str) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }
        self.store.delete(&blacklist_key(token)).await
    }

    /// 살아 있는 블랙리스트 항목의 대략적인 개수
    pub async fn size(&self) -> Result<usize, AppError> {
        self.store.count().await
    }

    /// 메모리 대체 저장소의 만료 항목을 정리합니다.
    pub fn prune_fallback(&self) -> usize {
        self.composite
            .as_ref()
            .map(|store| store.fallback().prune_expired())
            .unwrap_or(0)
    }

    fn ttl_for(&self, token: &str) -> Duration {
        match self.codec.expires_at(token) {
            Ok(expires_at) => (expires_at - self.clock.now()).max(Duration::seconds(1)),
            Err(_) => {
                log::debug!("토큰 만료 시각을 읽을 수 없어 대체 TTL 적용: fp={}", fingerprint(token));
                self.fallback_ttl
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::token::ExtraClaims;
    use crate::repositories::tokens::blacklist_store::test_support::FlakyRevocationStore;
    use crate::repositories::tokens::InMemoryRevocationStore;
    use crate::utils::clock::ManualClock;

    struct Fixture {
        clock: Arc<ManualClock>,
        primary: Arc<FlakyRevocationStore>,
        codec: Arc<TokenCodec>,
        blacklist: TokenBlacklist,
    }

    fn fixture(primary_down: bool) -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let primary = Arc::new(FlakyRevocationStore::new(clock.clone(), primary_down));
        let fallback = Arc::new(InMemoryRevocationStore::new(clock.clone()));
        let store = Arc::new(FallbackRevocationStore::new(primary.clone(), fallback));
        let codec = Arc::new(TokenCodec::with_secret("blacklist-test-secret", clock.clone()).unwrap());
        let blacklist = TokenBlacklist::with_fallback(store, codec.clone(), clock.clone(), Duration::hours(24));
        Fixture { clock, primary, codec, blacklist }
    }

    fn access_token(f: &Fixture, ttl: Duration) -> String {
        f.codec.issue("u1", 1, ExtraClaims::new(), ttl).unwrap()
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let f = fixture(false);

        f.blacklist.revoke("  ").await.unwrap();

        assert!(!f.blacklist.is_revoked("").await.unwrap());
        assert_eq!(f.blacklist.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revocation_survives_primary_failure_on_write() {
        let f = fixture(true);

        f.blacklist.revoke("tokA").await.unwrap();

        assert!(f.blacklist.is_revoked("tokA").await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation_survives_primary_outage_after_revoke() {
        let f = fixture(false);
        let token = access_token(&f, Duration::minutes(15));

        f.blacklist.revoke(&token).await.unwrap();
        f.primary.set_down(true);

        for _ in 0..3 {
            assert!(f.blacklist.is_revoked(&token).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_entry_lives_as_long_as_token() {
        let f = fixture(false);
        let token = access_token(&f, Duration::minutes(15));

        f.blacklist.revoke(&token).await.unwrap();

        f.clock.advance(Duration::minutes(14));
        assert!(f.blacklist.is_revoked(&token).await.unwrap());
        assert!(f.codec.validate(&token));

        f.clock.advance(Duration::minutes(1));
        assert!(!f.codec.validate(&token));
    }

    #[tokio::test]
    async fn test_unparseable_token_uses_fallback_ttl() {
        let f = fixture(false);

        f.blacklist.revoke("not-a-jwt").await.unwrap();

        f.clock.advance(Duration::hours(23));
        assert!(f.blacklist.is_revoked("not-a-jwt").await.unwrap());
        f.clock.advance(Duration::hours(1));
        assert!(!f.blacklist.is_revoked("not-a-jwt").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_twice_counts_once_and_unrevoke_is_idempotent() {
        let f = fixture(false);
        let token = access_token(&f, Duration::minutes(5));

        f.blacklist.revoke(&token).await.unwrap();
        f.blacklist.revoke(&token).await.unwrap();
        assert_eq!(f.blacklist.size().await.unwrap(), 1);

        f.blacklist.unrevoke(&token).await.unwrap();
        f.blacklist.unrevoke(&token).await.unwrap();
        assert!(!f.blacklist.is_revoked(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_fallback_drops_expired_entries() {
        let f = fixture(true);
        let token = access_token(&f, Duration::minutes(1));

        f.blacklist.revoke(&token).await.unwrap();
        f.clock.advance(Duration::minutes(2));

        assert_eq!(f.blacklist.prune_fallback(), 1);
    }
}
