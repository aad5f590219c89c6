//! 리프레시 토큰 엔티티

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 회전(rotation) 방식의 리프레시 토큰
///
/// 한 번 회전된 토큰(`rotated_at`이 채워진 토큰)은 다시 사용할 수 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshToken {
    pub id: String,
    pub owner_user_id: i64,
    /// 고엔트로피 불투명 값 (전역 유일)
    pub token_value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub rotated_at: Option<DateTime<Utc>>,
    /// 최초 로그인에서 발급된 세션 ID. 회전해도 유지됩니다.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_rotated(&self) -> bool {
        self.rotated_at.is_some()
    }

    /// 아직 회전되지 않았고 만료되지 않은 토큰인지 확인
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_rotated() && !self.is_expired(now)
    }
}
