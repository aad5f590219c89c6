//! 공통 유틸리티 함수 모듈
//!
//! 애플리케이션 전체에서 사용되는 공통 유틸리티 함수들을 제공합니다.
//!
//! # Modules
//!
//! - [`string_utils`] - 문자열 검증, 민감 정보 마스킹
//! - [`crypto`] - 난수 토큰 생성, SHA-256 해시, 상수 시간 비교
//! - [`clock`] - 주입 가능한 시간 소스
//! - [`client_ip`] - 신뢰 프록시 기반 클라이언트 IP 해석

pub mod string_utils;
pub mod crypto;
pub mod clock;
pub mod client_ip;
