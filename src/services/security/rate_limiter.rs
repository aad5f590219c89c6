//! 고정 윈도우 레이트 리미터
//!
//! 클라이언트 키와 등급별로 분/시간 두 윈도우를 셉니다. 윈도우는 시계 기준으로
//! 정렬되며(매 분 0초, 매 시 0분), 윈도우마다 별도의 카운터 키를 씁니다.
//!
//! 카운터는 [`RateLimitStore`]에 있어서 Redis를 쓰면 모든 인스턴스가 같은 한도를 공유합니다.
//! 요청은 먼저 두 카운터를 올리고, 올린 값이 한도를 넘으면 증가분을 되돌린 뒤 거부됩니다.
//! 허용된 요청은 각자 한도 이하의 값을 받았으므로 동시에 들어와도 허용 수가 한도를 넘지 않습니다.
//!
//! 카운터 저장소 장애 시에는 요청을 막지 않고 에러 로그만 남깁니다.

use std::sync::Arc;

use chrono::Duration;

use crate::config::{RateLimitConfig, TierLimits};
use crate::domain::models::{RateLimitInfo, RateLimitTier};
use crate::errors::AppError;
use crate::repositories::rate_limit::{RateLimitStore, RATE_LIMIT_KEY_PREFIX};
use crate::utils::clock::Clock;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;

fn window_start(now: i64, length: i64) -> i64 {
    now - now.rem_euclid(length)
}

/// 한 시점에 적용되는 분/시간 카운터 키
struct WindowKeys {
    minute: String,
    hour: String,
}

impl WindowKeys {
    fn at(now: i64, tier: RateLimitTier, client_key: &str) -> Self {
        let key = |window: &str, length: i64| {
            format!(
                "{}{}:{}:{}:{}",
                RATE_LIMIT_KEY_PREFIX,
                tier.as_str().to_ascii_lowercase(),
                window,
                client_key,
                window_start(now, length)
            )
        };
        Self {
            minute: key("minute", MINUTE_SECS),
            hour: key("hour", HOUR_SECS),
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    auth_limits: TierLimits,
    api_limits: TierLimits,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        auth_limits: TierLimits,
        api_limits: TierLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            auth_limits,
            api_limits,
            clock,
        }
    }

    pub fn from_config(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, RateLimitConfig::auth_limits(), RateLimitConfig::api_limits(), clock)
    }

    pub fn limits(&self, tier: RateLimitTier) -> TierLimits {
        match tier {
            RateLimitTier::Auth => self.auth_limits,
            RateLimitTier::Api => self.api_limits,
        }
    }

    fn keys(&self, client_key: &str, tier: RateLimitTier) -> WindowKeys {
        WindowKeys::at(self.clock.now().timestamp(), tier, client_key)
    }

    /// 요청 하나를 소비합니다. 분/시간 중 하나라도 소진됐으면 `false`이고 카운터는 그대로입니다.
    ///
    /// # Errors
    ///
    /// 카운터 저장소 에러를 그대로 전달합니다.
    pub async fn try_consume(&self, client_key: &str, tier: RateLimitTier) -> Result<bool, AppError> {
        let limits = self.limits(tier);
        let keys = self.keys(client_key, tier);
        let minute_ttl = Duration::seconds(MINUTE_SECS);
        let hour_ttl = Duration::seconds(HOUR_SECS);

        let minute = self.store.increment(&keys.minute, minute_ttl).await?;
        let hour = match self.store.increment(&keys.hour, hour_ttl).await {
            Ok(hour) => hour,
            Err(e) => {
                self.rollback(&keys.minute, minute_ttl).await;
                return Err(e);
            }
        };

        if minute <= limits.per_minute && hour <= limits.per_hour {
            return Ok(true);
        }

        self.rollback(&keys.minute, minute_ttl).await;
        self.rollback(&keys.hour, hour_ttl).await;
        Ok(false)
    }

    async fn rollback(&self, key: &str, ttl: Duration) {
        if let Err(e) = self.store.decrement(key, ttl).await {
            log::warn!("레이트 리밋 카운터 복원 실패: key={}, {}", key, e);
        }
    }

    /// 현재 한도와 잔여 요청 수. 쿼터를 소비하지 않습니다.
    pub async fn get_info(&self, client_key: &str, tier: RateLimitTier) -> Result<RateLimitInfo, AppError> {
        let limits = self.limits(tier);
        let keys = self.keys(client_key, tier);
        let minute = self.store.count(&keys.minute).await?;
        let hour = self.store.count(&keys.hour).await?;

        Ok(RateLimitInfo {
            limit_per_minute: limits.per_minute,
            limit_per_hour: limits.per_hour,
            remaining: limits
                .per_minute
                .saturating_sub(minute)
                .min(limits.per_hour.saturating_sub(hour)),
        })
    }

    /// 소비를 시도하고 결과 현황을 반환합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::RateLimitExceeded` - 한도 초과
    pub async fn check(&self, client_key: &str, tier: RateLimitTier) -> Result<RateLimitInfo, AppError> {
        let limits = self.limits(tier);
        match self.try_consume(client_key, tier).await {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("레이트 리밋 초과: client={}, tier={}", client_key, tier.as_str());
                return Err(AppError::RateLimitExceeded {
                    limit_per_minute: limits.per_minute,
                    limit_per_hour: limits.per_hour,
                });
            }
            Err(e) => {
                log::error!("레이트 리밋 저장소 오류, 요청을 통과시킵니다: {}", e);
                return Ok(Self::unmetered(limits));
            }
        }

        match self.get_info(client_key, tier).await {
            Ok(info) => Ok(info),
            Err(e) => {
                log::warn!("레이트 리밋 현황 조회 실패: {}", e);
                Ok(Self::unmetered(limits))
            }
        }
    }

    fn unmetered(limits: TierLimits) -> RateLimitInfo {
        RateLimitInfo {
            limit_per_minute: limits.per_minute,
            limit_per_hour: limits.per_hour,
            remaining: limits.per_minute.min(limits.per_hour),
        }
    }

    /// 윈도우가 지난 카운터를 제거합니다. Redis 카운터는 TTL로 사라지므로 0입니다.
    pub fn prune_stale(&self) -> usize {
        self.store.prune_expired()
    }
}

/// 경로에 적용할 등급. 헬스 체크는 제외(`None`)합니다.
pub fn tier_for_path(path: &str) -> Option<RateLimitTier> {
    if path == "/health" || path.starts_with("/health/") {
        None
    } else if path.starts_with("/api/v1/auth/") {
        Some(RateLimitTier::Auth)
    } else {
        Some(RateLimitTier::Api)
    }
}
