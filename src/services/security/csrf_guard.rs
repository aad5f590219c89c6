//! CSRF double-submit 토큰 관리
//!
//! 인증된 subject마다 하나의 토큰만 유지합니다. 검증은 어떤 실패든 `false`로 닫힙니다.

use std::sync::Arc;

use chrono::Duration;

use crate::config::CsrfConfig;
use crate::errors::AppError;
use crate::repositories::csrf::CsrfTokenStore;
use crate::utils::crypto::{constant_time_eq, random_token};
use crate::utils::string_utils::clean_optional_str;

/// 상태 변경 요청이 CSRF 토큰을 실어 보내는 헤더
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

pub struct CsrfGuard {
    store: Arc<dyn CsrfTokenStore>,
    ttl: Duration,
}

impl CsrfGuard {
    pub fn new(store: Arc<dyn CsrfTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn from_config(store: Arc<dyn CsrfTokenStore>) -> Self {
        Self::new(store, CsrfConfig::token_ttl())
    }

    /// 새 토큰을 발급합니다. 이전 토큰은 더 이상 통과하지 못합니다.
    pub async fn issue_token(&self, subject: &str) -> Result<String, AppError> {
        if subject.trim().is_empty() {
            return Err(AppError::ValidationError("CSRF 토큰 발급 대상이 없습니다".to_string()));
        }

        let value = random_token(32);
        self.store.put(subject, &value, self.ttl).await?;
        Ok(value)
    }

    /// subject에 저장된 토큰과 정확히 일치하면 `true`.
    ///
    /// subject가 없거나, 토큰이 없거나, 저장소 조회가 실패하면 `false`입니다.
    pub async fn validate(&self, subject: Option<&str>, supplied: Option<&str>) -> bool {
        let (Some(subject), Some(supplied)) = (clean_optional_str(subject), clean_optional_str(supplied)) else {
            return false;
        };

        match self.store.get(subject).await {
            Ok(Some(expected)) => constant_time_eq(&expected, supplied),
            Ok(None) => false,
            Err(e) => {
                log::warn!("CSRF 토큰 조회 실패, 요청 거부: {}", e);
                false
            }
        }
    }

    /// subject의 토큰을 폐기합니다 (로그아웃, 탈퇴).
    pub async fn discard(&self, subject: &str) -> Result<(), AppError> {
        self.store.remove(subject).await
    }
}
