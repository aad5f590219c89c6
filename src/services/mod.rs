//! 비즈니스 로직을 담당하는 서비스 계층 모듈
//!
//! 모든 서비스는 생성자로 의존성을 주입받으며, [`crate::core::container::AppContainer`]가
//! 프로세스 시작 시 의존성 그래프를 한 번 조립합니다.
//!
//! # Features
//!
//! - [`auth`] - 토큰 코덱, 블랙리스트, 리프레시 토큰, 인증 오케스트레이터
//! - [`security`] - 레이트 리밋, CSRF 가드
//! - [`sessions`] - 로그인 이력과 활성 세션
//! - [`events`] - 로그아웃/탈퇴 후속 정리 이벤트

pub mod auth;
pub mod security;
pub mod sessions;
pub mod events;
