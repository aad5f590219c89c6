//! 인증 도메인 이벤트
//!
//! 느린 정리 작업(블랙리스트 마무리, 세션 종료, 리프레시 토큰 폐기)을
//! 요청 경로에서 분리하기 위해 비동기로 발행되는 이벤트들입니다.

use serde::Serialize;

/// 회원 탈퇴 이벤트
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberDeletedEvent {
    pub login_id: String,
    pub user_id: i64,
    /// 탈퇴 요청에 사용된 액세스 토큰
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    MemberDeleted(MemberDeletedEvent),
    /// 로그아웃으로 세션이 끝났음
    LoggedOut {
        user_id: i64,
        session_id: Option<String>,
    },
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::MemberDeleted(_) => "MemberDeletedEvent",
            AuthEvent::LoggedOut { .. } => "LoggedOutEvent",
        }
    }
}
