//! # HTTP Request Handlers Module
//!
//! HTTP 요청을 처리하는 핸들러 함수들입니다. 서비스는 [`AppContainer`](crate::core::AppContainer)가
//! 만든 `Arc`를 `web::Data::from`으로 감싸 주입합니다.
//!
//! ```text
//!   Client
//!     │ HTTP Request/Response
//!   RateLimitMiddleware → AuthMiddleware → CsrfMiddleware
//!     │
//!   Handlers (이 모듈)      ← Web Layer
//!     │
//!   Services                ← 인증 코어
//!     │
//!   Repositories            ← MongoDB / Redis / 메모리
//! ```
//!
//! ## 모듈 구성
//!
//! - [`auth`] - 로그인, 토큰 갱신, OAuth2 콜백, 로그아웃, CSRF 토큰
//! - [`sessions`] - 로그인 이력과 활성 세션
//! - [`members`] - 회원 탈퇴
//!
//! 에러는 모두 `Result<HttpResponse, AppError>`로 반환하고,
//! `AppError`의 `ResponseError` 구현이 `{error, message, timestamp}` JSON으로 변환합니다.

pub mod auth;
pub mod sessions;
pub mod members;
