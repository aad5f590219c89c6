//! # Configuration Module
//!
//! 인증 코어의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 기반의 설정값들을 관심사별 구조체의 정적 접근자로 제공합니다.
//!
//! ## 모듈 구성
//!
//! - [`data_config`] - 저장소, 서버, 환경, 비밀번호 해시 설정
//! - [`auth_config`] - JWT 키와 토큰 수명, 인증 프로바이더
//! - [`security_config`] - 레이트 리밋, 신뢰 프록시, CSRF, 세션 이력, 블랙리스트
//!
//! ## 설계 원칙
//!
//! - 민감한 정보는 환경 변수로만 제공하며 기본값을 두지 않습니다 (`JWT_SECRET`).
//! - 숫자 설정의 파싱 실패는 경고 로그를 남기고 기본값을 사용합니다.
//! - 기간 설정은 최소 1단위입니다. 0이나 음수는 1로 올립니다.
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! # 필수
//! export JWT_SECRET="your-super-secret-key"
//!
//! # 저장소
//! export STORAGE_BACKEND="mongo"          # mongo | memory
//! export MONGODB_URI="mongodb://localhost:27017"
//! export DATABASE_NAME="hamalog"
//! export REDIS_URL="redis://localhost:6379"
//!
//! # 레이트 리밋
//! export RATE_LIMIT_AUTH_PER_MINUTE="5"
//! export RATE_LIMIT_API_PER_MINUTE="60"
//! export TRUSTED_PROXIES="10.0.0.1,10.0.0.2"
//! ```

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use chrono::Duration;

pub mod data_config;
pub mod auth_config;
pub mod security_config;

pub use data_config::*;
pub use auth_config::*;
pub use security_config::*;

/// 환경 변수를 파싱하고, 없거나 잘못된 경우 기본값을 사용합니다.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|e| {
            log::error!("{} 파싱 실패: {}. 기본값 {} 사용", key, e, default);
            default
        }),
        Err(_) => default,
    }
}

/// 기간 설정의 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    fn to_duration(self, amount: i64) -> Option<Duration> {
        match self {
            DurationUnit::Minutes => Duration::try_minutes(amount),
            DurationUnit::Hours => Duration::try_hours(amount),
            DurationUnit::Days => Duration::try_days(amount),
        }
    }
}

/// 기간 환경 변수를 읽습니다. [`positive_duration`] 규칙을 따릅니다.
pub(crate) fn env_duration(key: &str, default: i64, unit: DurationUnit) -> Duration {
    positive_duration(key, env_parse(key, default), default, unit)
}

/// 1 미만은 1로 올리고, `Duration`으로 표현할 수 없는 값은 기본값으로 대체합니다.
fn positive_duration(key: &str, amount: i64, default: i64, unit: DurationUnit) -> Duration {
    let amount = if amount < 1 {
        log::warn!("{} 값 {}은(는) 1 미만입니다. 1로 조정합니다", key, amount);
        1
    } else {
        amount
    };

    unit.to_duration(amount)
        .or_else(|| {
            log::error!("{} 값 {}이(가) 너무 큽니다. 기본값 {} 사용", key, amount, default);
            unit.to_duration(default)
        })
        .unwrap_or_else(Duration::zero)
}
