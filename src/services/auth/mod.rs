//! 인증 서비스 모듈
//!
//! 액세스 토큰 발급/검증부터 로그아웃·탈퇴 시 폐기까지의 토큰 수명주기를 담당합니다.
//!
//! # Features
//!
//! - JWT 액세스 토큰 (HS256, 선택적으로 RS256)
//! - 회전 방식 리프레시 토큰 (한 번만 교환 가능)
//! - 주 저장소 장애에도 유지되는 토큰 블랙리스트
//! - 로그인/갱신/로그아웃/탈퇴 오케스트레이션
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::auth::AuthService;
//!
//! let response = auth_service.login("hamalog", "password", &ctx).await?;
//! let user = auth_service.authenticate(&response.tokens.access_token).await?;
//! auth_service.logout(&user.access_token).await?;
//! ```

pub mod token_codec;
pub mod token_blacklist;
pub mod refresh_token_store;
pub mod credentials;
pub mod auth_service;

pub use token_codec::{extract_bearer_token, TokenCodec};
pub use token_blacklist::TokenBlacklist;
pub use refresh_token_store::RefreshTokenStore;
pub use credentials::{
    BcryptPasswordVerifier, CredentialAuthenticator, DisabledOAuth2Exchanger, ExternalIdentity,
    OAuth2CodeExchanger, PasswordCredentialAuthenticator, PasswordVerifier,
};
pub use auth_service::{AuthService, AuthServiceParts};
