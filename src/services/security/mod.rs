//! 요청 보호 서비스
//!
//! - [`rate_limiter`] - 클라이언트별 분/시간 요청 한도
//! - [`csrf_guard`] - 상태 변경 요청의 double-submit 토큰

pub mod rate_limiter;
pub mod csrf_guard;

pub use rate_limiter::{tier_for_path, RateLimiter};
pub use csrf_guard::{CsrfGuard, CSRF_HEADER};
