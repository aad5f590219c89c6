//! 애플리케이션 전역에서 사용하는 에러 시스템
//!
//! 인증/세션 보안 코어를 위한 통합 에러 처리 시스템입니다.
//! `thiserror`와 `actix_web::ResponseError`를 사용하여 모든 실패 분기가
//! 동일한 JSON 형태(`error`, `message`, `timestamp`)로 응답되도록 합니다.
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use crate::errors::AppError;
//!
//! async fn rotate(value: &str) -> Result<RefreshToken, AppError> {
//!     store.rotate(value).await
//!         .map_err(|_| AppError::TokenNotFoundOrExpired("refresh token".to_string()))
//! }
//! ```

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::utils::string_utils::redact_sensitive;

/// 애플리케이션 전역 에러 타입
///
/// 자동으로 HTTP 응답으로 변환되어 클라이언트에게 전달됩니다.
/// 인프라 계열 에러의 상세 내용은 서버 로그에만 남고 응답에는 일반 메시지만 노출됩니다.
#[derive(Error, Debug)]
pub enum AppError {
    /// 데이터베이스 관련 에러 (500 Internal Server Error)
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Redis 관련 에러 (500 Internal Server Error)
    #[error("Redis error: {0}")]
    RedisError(String),

    /// 입력값 검증 에러 (400 Bad Request)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 리소스 찾을 수 없음 에러 (404 Not Found)
    #[error("Not found: {0}")]
    NotFound(String),

    /// 충돌/중복 에러 (409 Conflict)
    #[error("Conflict error: {0}")]
    ConflictError(String),

    /// 인증 실패 에러 (401 Unauthorized)
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// 권한 부족 에러 (403 Forbidden)
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// 검증되지 않은 토큰에서 클레임을 읽으려 한 경우 (401 Unauthorized)
    #[error("Token parse error: {0}")]
    TokenParseError(String),

    /// 리프레시 토큰이 없거나 만료/이미 사용됨 (403 Forbidden)
    #[error("Token not found or expired: {0}")]
    TokenNotFoundOrExpired(String),

    /// 세션이 존재하지 않거나 다른 사용자의 세션 (403 Forbidden)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// CSRF 토큰 불일치 (403 Forbidden)
    #[error("CSRF token invalid: {0}")]
    CsrfTokenInvalid(String),

    /// 요청 한도 초과 (429 Too Many Requests)
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        limit_per_minute: u32,
        limit_per_hour: u32,
    },

    /// 외부 서비스 에러 (500 Internal Server Error)
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 설정 누락/오류 (500, 기동 시점에는 치명적)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 내부 서버 에러 (500 Internal Server Error)
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 응답 본문의 `error` 필드에 들어갈 기계 판독용 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::RedisError(_) => "CACHE_ERROR",
            AppError::ValidationError(_) => "VALIDATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ConflictError(_) => "CONFLICT",
            AppError::AuthenticationError(_) => "AUTHENTICATION_FAILED",
            AppError::AuthorizationError(_) => "ACCESS_DENIED",
            AppError::TokenParseError(_) => "INVALID_TOKEN",
            AppError::TokenNotFoundOrExpired(_) => "REFRESH_TOKEN_INVALID",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::CsrfTokenInvalid(_) => "CSRF_TOKEN_INVALID",
            AppError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 클라이언트에게 노출할 메시지
    ///
    /// 인프라 에러는 내부 정보를 숨기고, 나머지는 민감한 키워드를 마스킹한 뒤 반환합니다.
    pub fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_)
            | AppError::RedisError(_)
            | AppError::ExternalServiceError(_)
            | AppError::ConfigurationError(_)
            | AppError::InternalError(_) => {
                "요청을 처리하는 중 서버 오류가 발생했습니다".to_string()
            }
            AppError::RateLimitExceeded { .. } => {
                "요청 한도를 초과했습니다. 잠시 후 다시 시도해주세요".to_string()
            }
            other => redact_sensitive(other.detail()),
        }
    }

    fn detail(&self) -> &str {
        match self {
            AppError::DatabaseError(msg)
            | AppError::RedisError(msg)
            | AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::ConflictError(msg)
            | AppError::AuthenticationError(msg)
            | AppError::AuthorizationError(msg)
            | AppError::TokenParseError(msg)
            | AppError::TokenNotFoundOrExpired(msg)
            | AppError::SessionNotFound(msg)
            | AppError::CsrfTokenInvalid(msg)
            | AppError::ExternalServiceError(msg)
            | AppError::ConfigurationError(msg)
            | AppError::InternalError(msg) => msg,
            AppError::RateLimitExceeded { .. } => "",
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::AuthenticationError(_) | AppError::TokenParseError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AuthorizationError(_)
            | AppError::TokenNotFoundOrExpired(_)
            | AppError::SessionNotFound(_)
            | AppError::CsrfTokenInvalid(_) => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// HTTP 에러 응답을 생성합니다.
    ///
    /// 각 에러 타입을 적절한 HTTP 상태 코드와 JSON 응답으로 변환합니다.
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{}", redact_sensitive(&self.to_string()));
        }

        let mut builder = HttpResponse::build(status);
        if let AppError::RateLimitExceeded {
            limit_per_minute,
            limit_per_hour,
        } = self
        {
            builder
                .insert_header(("X-RateLimit-Limit-Minute", limit_per_minute.to_string()))
                .insert_header(("X-RateLimit-Limit-Hour", limit_per_hour.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"));
        }

        builder.json(serde_json::json!({
            "error": self.error_code(),
            "message": self.public_message(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

/// 외부 라이브러리 에러를 AppError로 변환하는 확장 trait
pub trait ErrorContext<T> {
    /// 컨텍스트 정보와 함께 에러를 변환합니다.
    fn context(self, msg: &str) -> AppResult<T>;

    /// 클로저를 사용하여 지연 평가된 컨텍스트를 제공합니다.
    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", msg, e)))
    }

    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", f(), e)))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::RedisError(err.to_string())
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_validation_error_response() {
        let error = AppError::ValidationError("loginId is required".to_string());
        assert_eq!(error.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authentication_error_response() {
        let error = AppError::AuthenticationError("Invalid token".to_string());
        assert_eq!(error.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_session_and_refresh_failures_are_forbidden() {
        assert_eq!(
            AppError::SessionNotFound("s-1".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::TokenNotFoundOrExpired("refresh".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::CsrfTokenInvalid("mismatch".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn test_csrf_error_body_shape() {
        let (status, body) = body_json(AppError::CsrfTokenInvalid("mismatch".to_string())).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "CSRF_TOKEN_INVALID");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_rate_limit_response_has_headers() {
        let error = AppError::RateLimitExceeded {
            limit_per_minute: 5,
            limit_per_hour: 20,
        };
        let response = error.error_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("X-RateLimit-Limit-Minute").unwrap(), "5");
        assert_eq!(response.headers().get("X-RateLimit-Limit-Hour").unwrap(), "20");
        assert_eq!(response.headers().get("X-RateLimit-Remaining").unwrap(), "0");
    }

    #[actix_web::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) =
            body_json(AppError::DatabaseError("connection refused to 10.0.0.5".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[test]
    fn test_sensitive_values_are_not_echoed() {
        let error = AppError::ValidationError("password=hunter2 rejected".to_string());
        let message = error.public_message();

        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_error_context_trait() {
        let result: Result<(), &str> = Err("original error");
        let app_result = result.context("Additional context");

        if let Err(AppError::InternalError(msg)) = app_result {
            assert!(msg.contains("Additional context"));
            assert!(msg.contains("original error"));
        } else {
            panic!("Expected InternalError");
        }
    }
}
