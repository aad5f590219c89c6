//! 도메인 모델
//!
//! 영속되지 않는 값 객체들입니다.
//!
//! - [`token`] - 액세스 토큰 클레임, 토큰 쌍
//! - [`auth`] - 인증된 사용자, 요청 컨텍스트
//! - [`rate_limit`] - 레이트 리밋 등급과 현황

pub mod token;
pub mod auth;
pub mod rate_limit;

pub use token::{ExtraClaims, TokenClaims, TokenPair};
pub use auth::{AuthenticatedUser, ClientIp, RequestContext};
pub use rate_limit::{RateLimitInfo, RateLimitTier};
