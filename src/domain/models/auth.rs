//! 요청 단위 인증 모델
//!
//! 미들웨어가 request extension에 넣어 두고 핸들러가 추출하는 값들입니다.

use std::future::{ready, Ready};

use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// JWT 토큰에서 추출된 사용자 정보
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    /// 토큰 subject (로그인 아이디)
    pub subject: String,

    /// 정수형 회원 ID
    pub user_id: i64,

    /// 권한
    pub role: Option<String>,

    /// 토큰에 담긴 세션 ID
    pub session_id: Option<String>,

    /// 요청에 제시된 원본 액세스 토큰 (로그아웃/탈퇴 시 블랙리스트 대상)
    #[serde(skip_serializing)]
    pub access_token: String,
}

/// ActixWeb FromRequest trait 구현
impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<actix_web::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AppError::AuthenticationError(
                "인증되지 않은 요청입니다".to_string(),
            )
            .into())),
        }
    }
}

/// 레이트 리밋 미들웨어가 결정한 클라이언트 IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// 요청 단위 진단 컨텍스트
///
/// 오케스트레이터 호출에 명시적으로 전달되어 로그와 로그인 이력에 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub client_ip: String,
    pub user_agent: String,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(client_ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            user_agent: user_agent.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn from_http_request(req: &HttpRequest) -> Self {
        let client_ip = req
            .extensions()
            .get::<ClientIp>()
            .map(|ip| ip.0.clone())
            .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        let user_agent = req
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        let mut context = Self::new(client_ip, user_agent);
        if let Some(request_id) = req.headers().get("X-Request-ID").and_then(|h| h.to_str().ok()) {
            context.request_id = request_id.chars().take(64).collect();
        }
        context
    }
}

impl FromRequest for RequestContext {
    type Error = Error;
    type Future = Ready<actix_web::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(Self::from_http_request(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_request_context_prefers_resolved_client_ip() {
        let req = TestRequest::default()
            .insert_header(("User-Agent", "Mozilla/5.0"))
            .insert_header(("X-Request-ID", "req-42"))
            .to_http_request();
        req.extensions_mut().insert(ClientIp("198.51.100.3".to_string()));

        let context = RequestContext::from_http_request(&req);

        assert_eq!(context.client_ip, "198.51.100.3");
        assert_eq!(context.user_agent, "Mozilla/5.0");
        assert_eq!(context.request_id, "req-42");
    }

    #[actix_web::test]
    async fn test_missing_user_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let result = AuthenticatedUser::extract(&req).await;

        let err = result.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
