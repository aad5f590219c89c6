//! 캐싱 계층 모듈
//!
//! Redis를 백엔드로 하는 만료 키 저장소를 제공합니다.
//! 토큰 블랙리스트와 CSRF 토큰이 이 계층을 사용합니다.
//!
//! # 환경 설정
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379  # 기본값
//! ```

pub mod redis;
