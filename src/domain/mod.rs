//! # Domain Layer Module
//!
//! 인증 코어의 도메인 계층입니다.
//!
//! ```text
//! Domain Layer (이 모듈)
//! ├── Entities  - 저장소에 기록되는 객체 (회원, 리프레시 토큰, 로그인 이력)
//! ├── Models    - 영속되지 않는 값 객체 (토큰 클레임, 인증 사용자, 레이트 리밋 현황)
//! ├── DTOs      - HTTP 요청/응답 계약
//! └── Events    - 비동기 정리 작업용 도메인 이벤트
//! ```

pub mod entities;
pub mod models;
pub mod dto;
pub mod events;

pub use dto::ApiResponse;
