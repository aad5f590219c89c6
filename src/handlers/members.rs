//! Member HTTP Handlers

use actix_web::{delete, web, HttpResponse};

use crate::domain::models::AuthenticatedUser;
use crate::errors::AppError;
use crate::services::auth::AuthService;

/// 회원 탈퇴
///
/// 현재 액세스 토큰은 즉시 폐기되고, 리프레시 토큰/세션/로그인 이력 정리는
/// `MemberDeleted` 이벤트로 비동기 처리됩니다.
///
/// # Endpoint
/// `DELETE /api/v1/members/me`
#[delete("/me")]
pub async fn delete_me(
    auth_service: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    auth_service.delete_account(&user).await?;
    log::info!("회원 탈퇴 완료: user_id={}", user.user_id);
    Ok(HttpResponse::NoContent().finish())
}
