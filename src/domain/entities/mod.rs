//! 도메인 엔티티
//!
//! 영속 저장소에 기록되는 인증 코어의 객체들입니다.
//!
//! - [`member`] - 로그인 주체 (회원 도메인의 최소 투영)
//! - [`refresh_token`] - 회전 방식 리프레시 토큰
//! - [`login_history`] - 로그인 시도 원장과 활성 세션

pub mod member;
pub mod refresh_token;
pub mod login_history;

pub use member::Member;
pub use refresh_token::RefreshToken;
pub use login_history::{ActiveSession, DeviceType, LoginHistoryRecord, LoginStatus, Page};
