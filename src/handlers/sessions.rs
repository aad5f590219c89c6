//! Session HTTP Handlers
//!
//! 로그인 이력 조회와 활성 세션 관리 엔드포인트입니다. 모두 인증이 필요합니다.
//!
//! - `GET /api/v1/sessions/history?page=0&size=20`
//! - `GET /api/v1/sessions/active`
//! - `DELETE /api/v1/sessions/{session_id}`
//! - `DELETE /api/v1/sessions`

use actix_web::{delete, get, web, HttpResponse};
use serde_json::json;

use crate::domain::dto::{ApiResponse, HistoryQuery};
use crate::domain::models::AuthenticatedUser;
use crate::errors::AppError;
use crate::services::auth::AuthService;
use crate::services::sessions::SessionTracker;

#[get("/history")]
pub async fn login_history(
    sessions: web::Data<SessionTracker>,
    user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let page = sessions.list_history(user.user_id, query.page, query.size).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

/// 활성 세션 목록. 요청에 사용된 토큰의 세션은 `is_current`로 표시됩니다.
#[get("/active")]
pub async fn active_sessions(
    sessions: web::Data<SessionTracker>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let active = sessions
        .list_active_sessions(user.user_id, user.session_id.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(active)))
}

/// 본인 소유 세션 하나를 종료합니다. 없거나 다른 사용자의 세션이면 403입니다.
///
/// 세션의 리프레시 토큰도 함께 삭제되어 해당 기기는 다시 로그인해야 합니다.
#[delete("/{session_id}")]
pub async fn terminate_session(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
    session_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth_service.terminate_session(user.user_id, &session_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("")]
pub async fn terminate_all_sessions(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let terminated = auth_service.terminate_all_sessions(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(json!({ "terminated_sessions": terminated }))))
}
