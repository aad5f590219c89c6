//! 데이터 전송 객체 (DTO)
//!
//! HTTP 요청/응답 계약을 정의합니다.

pub mod auth;
pub mod sessions;

use serde::Serialize;

pub use auth::{CsrfTokenResponse, LoginRequest, LoginResponse, OAuthCallbackQuery, RefreshTokenRequest};
pub use sessions::HistoryQuery;

/// API 응답 래퍼
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}
