//! 인증 요청/응답 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::TokenPair;

/// 로컬 로그인 요청 구조체
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "아이디를 입력해주세요"))]
    pub login_id: String,

    #[validate(length(min = 1, max = 128, message = "비밀번호를 입력해주세요"))]
    pub password: String,
}

/// 리프레시 토큰 요청 구조체
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "리프레시 토큰이 필요합니다"))]
    pub refresh_token: String,
}

/// OAuth 콜백 쿼리 파라미터 구조체
#[derive(Debug, Deserialize, Validate)]
pub struct OAuthCallbackQuery {
    #[validate(length(min = 1, message = "Authorization code가 필요합니다"))]
    pub code: String,

    pub state: Option<String>,
}

/// 로그인/OAuth 로그인 응답
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub session_id: String,
    pub csrf_token: String,
}

/// CSRF 토큰 발급 응답
#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    pub header_name: &'static str,
}
