//! 자격 증명 검증 협력자
//!
//! 인증 코어가 외부에 요구하는 인터페이스들입니다.
//!
//! - [`PasswordVerifier`] - 평문과 해시 비교 (기본 구현: bcrypt)
//! - [`CredentialAuthenticator`] - 로그인 아이디/비밀번호로 회원 확인
//! - [`OAuth2CodeExchanger`] - OAuth2 authorization code를 검증된 외부 신원으로 교환
//!
//! 실패 메시지는 "없는 아이디"와 "틀린 비밀번호"를 구분하지 않습니다.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AuthProvider;
use crate::domain::entities::Member;
use crate::errors::AppError;
use crate::repositories::members::UserLookup;

const INVALID_CREDENTIALS: &str = "아이디 또는 비밀번호가 올바르지 않습니다";

pub trait PasswordVerifier: Send + Sync {
    fn matches(&self, plain: &str, hash: &str) -> bool;
}

/// bcrypt 해시 검증기
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptPasswordVerifier;

impl PasswordVerifier for BcryptPasswordVerifier {
    fn matches(&self, plain: &str, hash: &str) -> bool {
        match bcrypt::verify(plain, hash) {
            Ok(valid) => valid,
            Err(e) => {
                log::error!("비밀번호 해시 검증 실패: {}", e);
                false
            }
        }
    }
}

#[async_trait]
pub trait CredentialAuthenticator: Send + Sync {
    /// # Errors
    ///
    /// * `AppError::AuthenticationError` - 회원이 없거나 비밀번호 불일치 (동일 메시지)
    async fn authenticate(&self, login_id: &str, password: &str) -> Result<Member, AppError>;
}

/// 회원 저장소 + 비밀번호 검증기 조합
pub struct PasswordCredentialAuthenticator {
    users: Arc<dyn UserLookup>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl PasswordCredentialAuthenticator {
    pub fn new(users: Arc<dyn UserLookup>, verifier: Arc<dyn PasswordVerifier>) -> Self {
        Self { users, verifier }
    }
}

#[async_trait]
impl CredentialAuthenticator for PasswordCredentialAuthenticator {
    async fn authenticate(&self, login_id: &str, password: &str) -> Result<Member, AppError> {
        let member = self
            .users
            .find_by_login_id(login_id)
            .await?
            .ok_or_else(|| AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        // OAuth 전용 회원은 비밀번호 로그인 불가
        let hash = member
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        if !self.verifier.matches(password, hash) {
            return Err(AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()));
        }
        Ok(member)
    }
}

/// OAuth2 프로바이더가 확인해 준 외부 신원
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalIdentity {
    pub provider: AuthProvider,
    pub provider_user_id: String,
    /// 회원의 로그인 아이디와 대응되는 값 (보통 이메일)
    pub login_id: String,
}

#[async_trait]
pub trait OAuth2CodeExchanger: Send + Sync {
    async fn exchange(
        &self,
        provider: AuthProvider,
        code: &str,
        state: Option<&str>,
    ) -> Result<ExternalIdentity, AppError>;
}

/// 프로바이더 연동이 없는 배포에서 사용하는 교환기. 항상 실패합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOAuth2Exchanger;

#[async_trait]
impl OAuth2CodeExchanger for DisabledOAuth2Exchanger {
    async fn exchange(
        &self,
        provider: AuthProvider,
        _code: &str,
        _state: Option<&str>,
    ) -> Result<ExternalIdentity, AppError> {
        Err(AppError::ExternalServiceError(format!(
            "{} OAuth2 연동이 설정되지 않았습니다",
            provider.as_str()
        )))
    }
}
