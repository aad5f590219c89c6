//! 보안 관련 런타임 설정
//!
//! 레이트 리밋 한도, 신뢰 프록시, CSRF 토큰 수명, 로그인 이력 보관 정책,
//! 블랙리스트 대체 TTL을 환경 변수에서 읽습니다.

use std::env;
use std::net::IpAddr;

use chrono::Duration;

use crate::config::{env_duration, env_parse, DurationUnit};

/// 레이트 리밋 한도 한 벌 (분당/시간당)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub per_minute: u32,
    pub per_hour: u32,
}

/// 레이트 리밋 설정
pub struct RateLimitConfig;

impl RateLimitConfig {
    /// 인증 엔드포인트용 엄격한 한도 (기본 5/분, 20/시간)
    pub fn auth_limits() -> TierLimits {
        TierLimits {
            per_minute: env_parse("RATE_LIMIT_AUTH_PER_MINUTE", 5u32),
            per_hour: env_parse("RATE_LIMIT_AUTH_PER_HOUR", 20u32),
        }
    }

    /// 일반 API용 완화된 한도 (기본 60/분, 1000/시간)
    pub fn api_limits() -> TierLimits {
        TierLimits {
            per_minute: env_parse("RATE_LIMIT_API_PER_MINUTE", 60u32),
            per_hour: env_parse("RATE_LIMIT_API_PER_HOUR", 1000u32),
        }
    }

    /// `TRUSTED_PROXIES` (쉼표 구분). 해석할 수 없는 항목은 경고 후 무시합니다.
    pub fn trusted_proxies() -> Vec<IpAddr> {
        parse_proxy_list(&env::var("TRUSTED_PROXIES").unwrap_or_default())
    }
}

pub(crate) fn parse_proxy_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(e) => {
                log::warn!("TRUSTED_PROXIES 항목 무시: {} ({})", s, e);
                None
            }
        })
        .collect()
}

/// CSRF 토큰 설정
pub struct CsrfConfig;

impl CsrfConfig {
    pub fn token_ttl() -> Duration {
        env_duration("CSRF_TOKEN_TTL_MINUTES", 120, DurationUnit::Minutes)
    }
}

/// 로그인 이력/세션 설정
pub struct SessionConfig;

impl SessionConfig {
    /// 이력 조회 페이지 크기 상한
    pub fn max_page_size() -> u32 {
        env_parse("LOGIN_HISTORY_MAX_PAGE_SIZE", 100u32)
    }

    /// 로그인 이력 보관 기간
    pub fn history_retention() -> Duration {
        env_duration("LOGIN_HISTORY_RETENTION_DAYS", 90, DurationUnit::Days)
    }
}

/// 토큰 블랙리스트 설정
pub struct BlacklistConfig;

impl BlacklistConfig {
    /// 토큰 만료 시각을 읽지 못했을 때 적용하는 보수적 TTL (기본 24시간)
    pub fn fallback_ttl() -> Duration {
        env_duration("BLACKLIST_FALLBACK_TTL_HOURS", 24, DurationUnit::Hours)
    }
}
