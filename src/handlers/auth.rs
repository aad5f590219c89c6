//! Authentication HTTP Handlers
//!
//! 로그인, 토큰 갱신, 로그아웃 등 인증 흐름의 HTTP 엔드포인트입니다.
//! 비즈니스 로직은 모두 [`AuthService`]에 있고, 핸들러는 요청 파싱과 응답 구성만 담당합니다.
//!
//! # Public
//!
//! - `POST /api/v1/auth/login` - 아이디/비밀번호 로그인
//! - `POST /api/v1/auth/refresh` - 리프레시 토큰 회전 (쿠키 또는 본문)
//! - `POST /api/v1/auth/oauth2/{provider}/callback` - OAuth2 authorization code 로그인
//!
//! # Protected (Bearer + CSRF)
//!
//! - `POST /api/v1/auth/logout`
//! - `POST /api/v1/auth/logout-all`
//! - `GET /api/v1/auth/csrf-token`

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::config::AuthProvider;
use crate::domain::dto::{ApiResponse, LoginRequest, OAuthCallbackQuery, RefreshTokenRequest};
use crate::domain::models::{AuthenticatedUser, RequestContext};
use crate::errors::AppError;
use crate::services::auth::AuthService;

const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// 로컬 로그인 핸들러
///
/// 성공 시 액세스/리프레시 토큰, 세션 ID, CSRF 토큰을 함께 반환합니다.
/// 실패 사유(아이디 없음, 비밀번호 불일치)는 응답에서 구분하지 않습니다.
///
/// # Endpoint
/// `POST /api/v1/auth/login`
#[post("/login")]
pub async fn login(
    auth_service: web::Data<AuthService>,
    ctx: RequestContext,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate().map_err(|e| AppError::ValidationError(e.to_string()))?;

    let response = auth_service.login(&payload.login_id, &payload.password, &ctx).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// 토큰 갱신 엔드포인트
///
/// 리프레시 토큰은 일회용입니다. 같은 토큰으로 두 번째 요청을 보내면 403(`TokenNotFoundOrExpired`)이 반환됩니다.
///
/// # Endpoint
/// `POST /api/v1/auth/refresh`
#[post("/refresh")]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    ctx: RequestContext,
    req: HttpRequest,
    body: Option<web::Json<RefreshTokenRequest>>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_refresh_token(&req, body.as_deref())?;
    let tokens = auth_service.refresh(&refresh_token, &ctx).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(tokens)))
}

/// OAuth2 콜백 처리 핸들러
///
/// 프로바이더에서 받은 authorization code를 교환하고, 연결된 회원으로 로그인합니다.
///
/// # Endpoint
/// `POST /api/v1/auth/oauth2/{provider}/callback?code={code}&state={state}`
#[post("/oauth2/{provider}/callback")]
pub async fn oauth2_callback(
    auth_service: web::Data<AuthService>,
    ctx: RequestContext,
    provider: web::Path<String>,
    query: web::Query<OAuthCallbackQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| AppError::ValidationError(e.to_string()))?;
    let provider = AuthProvider::from_str(&provider)?;

    let response = auth_service
        .oauth_login(provider, &query.code, query.state.as_deref(), &ctx)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// 현재 액세스 토큰을 폐기하고 세션을 종료합니다.
///
/// # Endpoint
/// `POST /api/v1/auth/logout`
pub async fn logout(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    auth_service.logout(&user.access_token).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "로그아웃되었습니다"
    })))
}

/// 모든 기기에서 로그아웃합니다. 사용자의 리프레시 토큰과 활성 세션이 모두 정리됩니다.
///
/// # Endpoint
/// `POST /api/v1/auth/logout-all`
pub async fn logout_all(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let terminated = auth_service.logout_all(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        json!({ "terminated_sessions": terminated }),
        "모든 기기에서 로그아웃되었습니다",
    )))
}

/// 인증된 사용자용 CSRF 토큰을 새로 발급합니다.
///
/// # Endpoint
/// `GET /api/v1/auth/csrf-token`
pub async fn csrf_token(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let response = auth_service.issue_csrf_token(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// HTTP 요청에서 리프레시 토큰 추출 (쿠키 우선, 다음으로 본문)
fn extract_refresh_token(req: &HttpRequest, body: Option<&RefreshTokenRequest>) -> Result<String, AppError> {
    if let Some(cookie) = req.cookie(REFRESH_TOKEN_COOKIE) {
        let token = cookie.value().trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    if let Some(body) = body {
        body.validate().map_err(|e| AppError::ValidationError(e.to_string()))?;
        return Ok(body.refresh_token.clone());
    }

    Err(AppError::AuthenticationError("리프레시 토큰이 제공되지 않았습니다".to_string()))
}
