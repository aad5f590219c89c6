//! 토큰 모델
//!
//! 액세스 토큰 클레임과 로그인/갱신 시 발급되는 토큰 쌍을 정의합니다.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 세션 ID 클레임 이름
pub const SESSION_ID_CLAIM: &str = "sid";
/// 권한 클레임 이름
pub const ROLE_CLAIM: &str = "role";

/// 발급 시 덧붙이는 추가 클레임
pub type ExtraClaims = Map<String, Value>;

/// 액세스 토큰 클레임
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// 사용자 식별자 (로그인 아이디)
    pub sub: String,
    /// 정수형 회원 ID
    pub user_id: i64,
    /// 발급 시각 (Unix timestamp, 초)
    pub iat: i64,
    /// 만료 시각 (Unix timestamp, 초)
    pub exp: i64,
    /// 토큰 고유 ID
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// `role`, `sid` 등 추가 클레임
    #[serde(flatten)]
    pub extra: ExtraClaims,
}

impl TokenClaims {
    pub fn role(&self) -> Option<&str> {
        self.extra.get(ROLE_CLAIM).and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.extra.get(SESSION_ID_CLAIM).and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// 액세스/리프레시 토큰 쌍
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// 액세스 토큰 유효 시간 (초)
    pub expires_in: i64,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
