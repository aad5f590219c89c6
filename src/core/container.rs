//! # Application Container
//!
//! 프로세스 시작 시 의존성 그래프를 명시적으로 조립하는 컴포지션 루트입니다.
//! 전역 레지스트리 없이 생성자 주입만 사용하며, 완성된 서비스들은 `web::Data`로 핸들러에 공유됩니다.
//!
//! ## 조립 순서
//!
//! ```text
//! Clock
//!  └─ TokenCodec
//!      ├─ TokenBlacklist ◀── FallbackRevocationStore(primary, memory)
//!      └─ AuthService ◀── RefreshTokenStore, SessionTracker, CsrfGuard,
//!                         CredentialAuthenticator, OAuth2CodeExchanger, EventPublisher
//! AuthEventHandler ◀── 이벤트 채널 (tokio::spawn)
//! RateLimiter ◀── RateLimitStore(Redis | DashMap)
//! ```
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! let container = AppContainer::build_mongo_redis(&database, redis, Arc::new(SystemClock)).await?;
//! let container = AppContainer::build_in_memory(&JwtConfig::secret()?)?;
//! ```

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::caching::redis::RedisClient;
use crate::config::{BlacklistConfig, JwtConfig, RateLimitConfig, SessionConfig};
use crate::db::Database;
use crate::domain::entities::Member;
use crate::errors::AppError;
use crate::repositories::csrf::{CsrfTokenStore, InMemoryCsrfTokenStore, RedisCsrfTokenStore};
use crate::repositories::members::{InMemoryMemberRepository, MemberRemoval, MongoMemberRepository, UserLookup};
use crate::repositories::rate_limit::{InMemoryRateLimitStore, RateLimitStore, RedisRateLimitStore};
use crate::repositories::sessions::{
    InMemoryLoginHistoryRepository, LoginHistoryRepository, MongoLoginHistoryRepository,
};
use crate::repositories::tokens::{
    FallbackRevocationStore, InMemoryRefreshTokenRepository, InMemoryRevocationStore,
    MongoRefreshTokenRepository, RedisRevocationStore, RefreshTokenRepository, RevocationStore,
};
use crate::services::auth::{
    AuthService, AuthServiceParts, BcryptPasswordVerifier, DisabledOAuth2Exchanger,
    OAuth2CodeExchanger, PasswordCredentialAuthenticator, RefreshTokenStore, TokenBlacklist, TokenCodec,
};
use crate::services::events::{AuthEventHandler, ChannelEventPublisher};
use crate::services::security::{CsrfGuard, RateLimiter};
use crate::services::sessions::SessionTracker;
use crate::utils::clock::{Clock, SystemClock};

/// 저장소 백엔드 묶음
pub struct StorageBackends {
    /// 블랙리스트 주 저장소. `None`이면 메모리 저장소만 사용합니다.
    pub revocation_primary: Option<Arc<dyn RevocationStore>>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub login_history: Arc<dyn LoginHistoryRepository>,
    pub csrf_tokens: Arc<dyn CsrfTokenStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub users: Arc<dyn UserLookup>,
    pub members: Arc<dyn MemberRemoval>,
}

/// 주기 정리 작업 결과
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub rate_limit_keys: usize,
    pub blacklist_entries: usize,
    pub refresh_tokens: u64,
    pub login_history: u64,
}

pub struct AppContainer {
    pub clock: Arc<dyn Clock>,
    pub codec: Arc<TokenCodec>,
    pub blacklist: Arc<TokenBlacklist>,
    pub refresh_tokens: Arc<RefreshTokenStore>,
    pub sessions: Arc<SessionTracker>,
    pub csrf_guard: Arc<CsrfGuard>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth_service: Arc<AuthService>,
    pub trusted_proxies: Vec<IpAddr>,
    /// 메모리 백엔드일 때만 존재 (개발용 계정 등록)
    memory_members: Option<Arc<InMemoryMemberRepository>>,
}

impl AppContainer {
    /// 주어진 저장소로 전체 그래프를 조립하고 이벤트 핸들러를 시작합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn build_with_stores(
        codec: TokenCodec,
        stores: StorageBackends,
        clock: Arc<dyn Clock>,
        oauth: Arc<dyn OAuth2CodeExchanger>,
    ) -> Self {
        let codec = Arc::new(codec);

        let fallback = Arc::new(InMemoryRevocationStore::new(clock.clone()));
        let primary = stores.revocation_primary.unwrap_or_else(|| {
            log::warn!("블랙리스트 주 저장소 없음: 메모리 저장소만 사용합니다");
            Arc::new(InMemoryRevocationStore::new(clock.clone()))
        });
        let blacklist = Arc::new(TokenBlacklist::with_fallback(
            Arc::new(FallbackRevocationStore::new(primary, fallback)),
            codec.clone(),
            clock.clone(),
            BlacklistConfig::fallback_ttl(),
        ));

        let refresh_tokens = Arc::new(RefreshTokenStore::new(
            stores.refresh_tokens,
            clock.clone(),
            JwtConfig::refresh_token_ttl(),
        ));
        let sessions = Arc::new(SessionTracker::from_config(
            stores.login_history,
            stores.users.clone(),
            clock.clone(),
        ));
        let csrf_guard = Arc::new(CsrfGuard::from_config(stores.csrf_tokens));
        let rate_limiter = Arc::new(RateLimiter::from_config(stores.rate_limits, clock.clone()));

        let (publisher, receiver) = ChannelEventPublisher::channel();
        let handler = Arc::new(AuthEventHandler::new(
            blacklist.clone(),
            sessions.clone(),
            refresh_tokens.clone(),
            csrf_guard.clone(),
        ));
        tokio::spawn(handler.run(receiver));

        let credentials = Arc::new(PasswordCredentialAuthenticator::new(
            stores.users.clone(),
            Arc::new(BcryptPasswordVerifier),
        ));
        let auth_service = Arc::new(AuthService::new(AuthServiceParts {
            codec: codec.clone(),
            blacklist: blacklist.clone(),
            refresh_tokens: refresh_tokens.clone(),
            sessions: sessions.clone(),
            csrf: csrf_guard.clone(),
            credentials,
            oauth,
            users: stores.users,
            members: stores.members,
            events: Arc::new(publisher),
            access_token_ttl: JwtConfig::access_token_ttl(),
        }));

        Self {
            clock,
            codec,
            blacklist,
            refresh_tokens,
            sessions,
            csrf_guard,
            rate_limiter,
            auth_service,
            trusted_proxies: RateLimitConfig::trusted_proxies(),
            memory_members: None,
        }
    }

    /// MongoDB + Redis 운영 구성. 컬렉션 인덱스를 생성합니다.
    pub async fn build_mongo_redis(
        database: &Database,
        redis: RedisClient,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let codec = TokenCodec::from_config(clock.clone())?;

        let refresh_tokens = MongoRefreshTokenRepository::new(database);
        refresh_tokens.create_indexes().await?;
        let login_history = MongoLoginHistoryRepository::new(database);
        login_history.create_indexes().await?;
        let members = Arc::new(MongoMemberRepository::new(database));
        members.create_indexes().await?;

        let stores = StorageBackends {
            revocation_primary: Some(Arc::new(RedisRevocationStore::new(redis.clone(), clock.clone()))),
            refresh_tokens: Arc::new(refresh_tokens),
            login_history: Arc::new(login_history),
            csrf_tokens: Arc::new(RedisCsrfTokenStore::new(redis.clone())),
            rate_limits: Arc::new(RedisRateLimitStore::new(redis)),
            users: members.clone(),
            members,
        };

        Ok(Self::build_with_stores(codec, stores, clock, Arc::new(DisabledOAuth2Exchanger)))
    }

    /// 전부 메모리 저장소를 쓰는 개발/테스트 구성
    pub fn build_in_memory(secret: &str) -> Result<Self, AppError> {
        Self::build_in_memory_with_clock(secret, Arc::new(SystemClock))
    }

    pub fn build_in_memory_with_clock(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let codec = TokenCodec::with_secret(secret, clock.clone())?.with_issuer(JwtConfig::issuer());
        let members = Arc::new(InMemoryMemberRepository::new());

        let stores = StorageBackends {
            revocation_primary: None,
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::new()),
            login_history: Arc::new(InMemoryLoginHistoryRepository::new()),
            csrf_tokens: Arc::new(InMemoryCsrfTokenStore::new(clock.clone())),
            rate_limits: Arc::new(InMemoryRateLimitStore::new(clock.clone())),
            users: members.clone(),
            members: members.clone(),
        };

        let mut container = Self::build_with_stores(codec, stores, clock, Arc::new(DisabledOAuth2Exchanger));
        container.memory_members = Some(members);
        Ok(container)
    }

    /// 메모리 백엔드에 회원을 등록합니다. 다른 백엔드에서는 `false`.
    pub fn seed_member(&self, member: Member) -> bool {
        match &self.memory_members {
            Some(members) => {
                members.insert(member);
                true
            }
            None => false,
        }
    }

    /// 만료 데이터를 한 번 정리합니다. 개별 실패는 로그만 남깁니다.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport {
            rate_limit_keys: self.rate_limiter.prune_stale(),
            blacklist_entries: self.blacklist.prune_fallback(),
            ..MaintenanceReport::default()
        };

        match self.refresh_tokens.purge_expired().await {
            Ok(count) => report.refresh_tokens = count,
            Err(e) => log::warn!("만료 리프레시 토큰 정리 실패: {}", e),
        }
        match self.sessions.purge_older_than(SessionConfig::history_retention()).await {
            Ok(count) => report.login_history = count,
            Err(e) => log::warn!("로그인 이력 정리 실패: {}", e),
        }

        log::debug!("정리 작업 완료: {:?}", report);
        report
    }

    /// `interval`마다 [`run_maintenance`](Self::run_maintenance)를 실행하는 태스크를 시작합니다.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: StdDuration) -> tokio::task::JoinHandle<()> {
        let container = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                container.run_maintenance().await;
            }
        })
    }
}
