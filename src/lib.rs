//! Hamalog 인증/세션 보안 코어
//!
//! 복약 관리 백엔드 Hamalog의 인증 계층을 Rust로 구현한 서비스입니다.
//! JWT 액세스 토큰, 일회용 리프레시 토큰, 토큰 블랙리스트, 레이트 리밋,
//! CSRF 보호, 로그인 이력/세션 추적을 제공합니다.
//!
//! # Features
//!
//! - **JWT 인증**: HS256(기본) 또는 RS256 서명, 주입된 시계 기준 만료 검증
//! - **리프레시 토큰 회전**: 원자적 compare-and-set으로 재사용 차단
//! - **블랙리스트**: Redis 주 저장소 + 메모리 대체 저장소
//! - **레이트 리밋**: 클라이언트 IP별 AUTH/API 등급 분/시간 한도
//! - **CSRF**: 사용자별 토큰, 상태 변경 요청에서 상수 시간 비교
//! - **세션 추적**: 로그인 이력, 활성 세션 조회/종료
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Routes   │ ← REST API 엔드포인트 + 미들웨어
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Handlers     │ ← 요청/응답 처리
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Services     │ ← AuthService 오케스트레이터와 보안 컴포넌트
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Repositories   │ ← 저장소 trait와 구현
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ MongoDB + Redis │ ← 또는 메모리 (개발/테스트)
//! └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use hamalog_auth::core::AppContainer;
//! use hamalog_auth::domain::models::RequestContext;
//!
//! let container = AppContainer::build_in_memory("secret")?;
//! let ctx = RequestContext::new("127.0.0.1", "curl/8.0");
//! let login = container.auth_service.login("hamalog", "password", &ctx).await?;
//! let user = container.auth_service.authenticate(&login.tokens.access_token).await?;
//! ```

pub mod core;
pub mod config;
pub mod db;
pub mod caching;
pub mod domain;
pub mod repositories;
pub mod services;
pub mod utils;
pub mod routes;
pub mod handlers;
pub mod errors;
pub mod middlewares;
