//! 미들웨어 모듈
//!
//! ActixWeb 애플리케이션의 요청 처리 파이프라인에서 사용되는 미들웨어들을 제공합니다.
//! 어노테이션 기반 횡단 관심사 대신, 각 관심사를 독립적으로 테스트 가능한 Transform으로 둡니다.
//!
//! # 제공 미들웨어
//!
//! ### 1. 레이트 리밋 (RateLimitMiddleware)
//! - 신뢰 프록시 규칙으로 클라이언트 IP 결정
//! - 인증 엔드포인트(AUTH)와 일반 API(API) 등급별 분/시간 한도
//! - `X-RateLimit-*` 응답 헤더, 초과 시 429
//!
//! ### 2. 인증 미들웨어 (AuthMiddleware)
//! - Bearer 토큰 추출 및 서명/만료 검증
//! - 블랙리스트 확인
//! - 사용자 정보를 request extension에 저장, 실패 시 401
//!
//! ### 3. CSRF 미들웨어 (CsrfMiddleware)
//! - POST/PUT/PATCH/DELETE에 `X-CSRF-TOKEN` 요구, 실패 시 403
//!
//! # 등록 순서
//!
//! ```rust,ignore
//! App::new()
//!     .wrap(RateLimitMiddleware::new(limiter, trusted_proxies)) // 전역
//!     .service(
//!         web::scope("/api/v1/sessions")
//!             .wrap(CsrfMiddleware::new(csrf_guard))      // 안쪽: 인증 후 실행
//!             .wrap(AuthMiddleware::new(auth_service))     // 바깥쪽: 먼저 실행
//!     )
//! ```

pub mod auth_middleware;
mod auth_inner;
pub mod rate_limit;
pub mod csrf;

// 미들웨어 재export
pub use auth_middleware::AuthMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use csrf::CsrfMiddleware;
