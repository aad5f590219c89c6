//! 회원 엔티티
//!
//! 인증 코어가 회원 도메인에서 필요로 하는 최소한의 필드만 담습니다.

use serde::{Deserialize, Serialize};

/// 로그인 가능한 회원
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    /// 정수형 회원 ID
    pub member_id: i64,

    /// 로그인 아이디 (토큰의 `sub`)
    pub login_id: String,

    /// bcrypt 해시. OAuth 전용 회원은 `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// 권한 (예: `ROLE_USER`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Member {
    pub fn new(member_id: i64, login_id: impl Into<String>, password_hash: Option<String>) -> Self {
        Self {
            member_id,
            login_id: login_id.into(),
            password_hash,
            role: Some("ROLE_USER".to_string()),
        }
    }
}
