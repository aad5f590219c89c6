//! 레이트 리밋 모델

use serde::Serialize;

/// 레이트 리밋 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitTier {
    /// 로그인/토큰 발급 등 인증 엔드포인트 (엄격)
    Auth,
    /// 일반 API (완화)
    Api,
}

impl RateLimitTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitTier::Auth => "AUTH",
            RateLimitTier::Api => "API",
        }
    }
}

/// 응답 헤더에 싣는 레이트 리밋 현황
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit_per_minute: u32,
    pub limit_per_hour: u32,
    /// 두 윈도우 중 더 적게 남은 쪽의 잔여 요청 수
    pub remaining: u32,
}
