//! # Repository Layer
//!
//! 저장소 계층입니다. 각 저장소는 trait으로 정의되고,
//! 운영용(MongoDB/Redis)과 메모리용 구현을 함께 제공합니다.
//! 서비스는 `Arc<dyn Trait>`으로만 저장소를 참조하므로 백엔드를 조립 시점에 고를 수 있습니다.
//!
//! | 모듈 | 저장 대상 | 운영 백엔드 |
//! |------|-----------|-------------|
//! | [`tokens`] | 블랙리스트, 리프레시 토큰 | Redis, MongoDB |
//! | [`sessions`] | 로그인 이력 | MongoDB |
//! | [`csrf`] | CSRF 토큰 | Redis |
//! | [`members`] | 회원 조회/삭제 | MongoDB |
//! | [`rate_limit`] | 레이트 리밋 카운터 | Redis |

pub mod tokens;
pub mod sessions;
pub mod csrf;
pub mod members;
pub mod rate_limit;
