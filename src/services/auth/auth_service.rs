//! 인증 오케스트레이터
//!
//! 토큰 코덱, 블랙리스트, 리프레시 토큰, 세션 이력, CSRF 가드를 조합해
//! 로그인부터 로그아웃/탈퇴까지의 세션 상태 전이를 처리합니다.
//!
//! ```text
//! ANONYMOUS ──login──▶ AUTHENTICATED ──refresh──▶ AUTHENTICATED
//!                           │
//!                           ├──logout──────▶ LOGGED_OUT
//!                           └──delete_account──▶ REVOKED
//! ```
//!
//! 요청 단위 정보(IP, User-Agent, 요청 ID)는 [`RequestContext`]로 명시적으로 전달받습니다.

use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use crate::config::AuthProvider;
use crate::domain::dto::auth::{CsrfTokenResponse, LoginResponse};
use crate::domain::entities::Member;
use crate::domain::events::{AuthEvent, MemberDeletedEvent};
use crate::domain::models::token::{ExtraClaims, ROLE_CLAIM, SESSION_ID_CLAIM};
use crate::domain::models::{AuthenticatedUser, RequestContext, TokenPair};
use crate::errors::AppError;
use crate::repositories::members::{MemberRemoval, UserLookup};
use crate::services::auth::credentials::{CredentialAuthenticator, OAuth2CodeExchanger};
use crate::services::auth::{RefreshTokenStore, TokenBlacklist, TokenCodec};
use crate::services::events::EventPublisher;
use crate::services::security::{CsrfGuard, CSRF_HEADER};
use crate::services::sessions::SessionTracker;
use crate::utils::crypto::fingerprint;

const LOGIN_FAILED: &str = "아이디 또는 비밀번호가 올바르지 않습니다";

/// 오케스트레이터가 조합하는 구성 요소들
pub struct AuthServiceParts {
    pub codec: Arc<TokenCodec>,
    pub blacklist: Arc<TokenBlacklist>,
    pub refresh_tokens: Arc<RefreshTokenStore>,
    pub sessions: Arc<SessionTracker>,
    pub csrf: Arc<CsrfGuard>,
    pub credentials: Arc<dyn CredentialAuthenticator>,
    pub oauth: Arc<dyn OAuth2CodeExchanger>,
    pub users: Arc<dyn UserLookup>,
    pub members: Arc<dyn MemberRemoval>,
    pub events: Arc<dyn EventPublisher>,
    pub access_token_ttl: Duration,
}

pub struct AuthService {
    codec: Arc<TokenCodec>,
    blacklist: Arc<TokenBlacklist>,
    refresh_tokens: Arc<RefreshTokenStore>,
    sessions: Arc<SessionTracker>,
    csrf: Arc<CsrfGuard>,
    credentials: Arc<dyn CredentialAuthenticator>,
    oauth: Arc<dyn OAuth2CodeExchanger>,
    users: Arc<dyn UserLookup>,
    members: Arc<dyn MemberRemoval>,
    events: Arc<dyn EventPublisher>,
    access_token_ttl: Duration,
}

impl AuthService {
    pub fn new(parts: AuthServiceParts) -> Self {
        Self {
            codec: parts.codec,
            blacklist: parts.blacklist,
            refresh_tokens: parts.refresh_tokens,
            sessions: parts.sessions,
            csrf: parts.csrf,
            credentials: parts.credentials,
            oauth: parts.oauth,
            users: parts.users,
            members: parts.members,
            events: parts.events,
            access_token_ttl: parts.access_token_ttl,
        }
    }

    /// 아이디/비밀번호 로그인
    ///
    /// 실패한 시도도 로그인 이력에 남깁니다 (존재하는 회원인 경우).
    ///
    /// # Errors
    ///
    /// * `AppError::AuthenticationError` - 회원 없음/비밀번호 불일치 (동일 메시지)
    pub async fn login(&self, login_id: &str, password: &str, ctx: &RequestContext) -> Result<LoginResponse, AppError> {
        match self.credentials.authenticate(login_id, password).await {
            Ok(member) => self.complete_login(&member, ctx).await,
            Err(AppError::AuthenticationError(reason)) => {
                self.record_failed_login(login_id, ctx, &reason).await;
                Err(AppError::AuthenticationError(LOGIN_FAILED.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// OAuth2 authorization code 로그인. 외부 신원은 로그인 아이디로 기존 회원과 연결됩니다.
    pub async fn oauth_login(
        &self,
        provider: AuthProvider,
        code: &str,
        state: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<LoginResponse, AppError> {
        let identity = self.oauth.exchange(provider, code, state).await?;
        let member = self
            .users
            .find_by_login_id(&identity.login_id)
            .await?
            .ok_or_else(|| AppError::AuthenticationError("가입되지 않은 계정입니다".to_string()))?;

        log::info!("OAuth2 로그인: provider={}, user_id={}", provider.as_str(), member.member_id);
        self.complete_login(&member, ctx).await
    }

    /// 세션을 기록한 뒤 토큰을 발급합니다. 발급이 중간에 실패하면 방금 연 세션을 닫습니다.
    async fn complete_login(&self, member: &Member, ctx: &RequestContext) -> Result<LoginResponse, AppError> {
        let session_id = self
            .sessions
            .record_success(member.member_id, &ctx.client_ip, &ctx.user_agent)
            .await?;

        match self.issue_session_credentials(member, &session_id).await {
            Ok((access_token, refresh_token, csrf_token)) => {
                log::debug!("로그인 완료: request_id={}, user_id={}", ctx.request_id, member.member_id);
                Ok(LoginResponse {
                    tokens: TokenPair::bearer(access_token, refresh_token, self.access_token_ttl.num_seconds()),
                    session_id,
                    csrf_token,
                })
            }
            Err(e) => {
                log::error!("로그인 토큰 발급 실패, 세션을 닫습니다: session={}, {}", session_id, e);
                self.abandon_session(&session_id).await;
                Err(e)
            }
        }
    }

    /// 액세스 토큰, 리프레시 토큰, CSRF 토큰
    async fn issue_session_credentials(
        &self,
        member: &Member,
        session_id: &str,
    ) -> Result<(String, String, String), AppError> {
        let access_token = self.issue_access_token(
            &member.login_id,
            member.member_id,
            member.role.as_deref(),
            Some(session_id),
        )?;
        let refresh_token = self
            .refresh_tokens
            .create_for_session(member.member_id, Some(session_id.to_string()))
            .await?;
        let csrf_token = self.csrf.issue_token(&member.login_id).await?;
        Ok((access_token, refresh_token.token_value, csrf_token))
    }

    async fn abandon_session(&self, session_id: &str) {
        if let Err(e) = self.sessions.terminate_session_by_id(session_id).await {
            log::warn!("실패한 로그인 세션 종료 실패: session={}, {}", session_id, e);
        }
        if let Err(e) = self.refresh_tokens.revoke_for_session(session_id).await {
            log::warn!("실패한 로그인 리프레시 토큰 정리 실패: session={}, {}", session_id, e);
        }
    }

    async fn record_failed_login(&self, login_id: &str, ctx: &RequestContext, reason: &str) {
        match self.users.find_by_login_id(login_id).await {
            Ok(Some(member)) => {
                self.sessions
                    .record_failure(member.member_id, &ctx.client_ip, &ctx.user_agent, reason)
                    .await
            }
            Ok(None) => log::warn!("로그인 실패 (알 수 없는 아이디): ip={}", ctx.client_ip),
            Err(e) => log::warn!("로그인 실패 기록을 위한 회원 조회 실패: {}", e),
        }
    }

    fn issue_access_token(
        &self,
        subject: &str,
        user_id: i64,
        role: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<String, AppError> {
        let mut extra = ExtraClaims::new();
        if let Some(role) = role {
            extra.insert(ROLE_CLAIM.to_string(), Value::from(role));
        }
        if let Some(session_id) = session_id {
            extra.insert(SESSION_ID_CLAIM.to_string(), Value::from(session_id));
        }
        self.codec.issue(subject, user_id, extra, self.access_token_ttl)
    }

    /// 리프레시 토큰을 회전하고 새 토큰 쌍을 발급합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::TokenNotFoundOrExpired` - 회전 실패. 재로그인이 필요합니다.
    /// * `AppError::AuthenticationError` - 토큰 소유 회원이 더 이상 없음
    pub async fn refresh(&self, refresh_token: &str, ctx: &RequestContext) -> Result<TokenPair, AppError> {
        let rotated = self.refresh_tokens.rotate(refresh_token).await?;

        let Some(member) = self.users.find_by_id(rotated.owner_user_id).await? else {
            self.refresh_tokens.revoke_all_for_user(rotated.owner_user_id).await?;
            return Err(AppError::AuthenticationError("회원을 찾을 수 없습니다".to_string()));
        };

        let access_token = self.issue_access_token(
            &member.login_id,
            member.member_id,
            member.role.as_deref(),
            rotated.session_id.as_deref(),
        )?;

        log::debug!("토큰 갱신: request_id={}, user_id={}", ctx.request_id, member.member_id);
        Ok(TokenPair::bearer(
            access_token,
            rotated.token_value,
            self.access_token_ttl.num_seconds(),
        ))
    }

    /// 요청의 액세스 토큰을 검증하고 폐기 여부를 확인합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::AuthenticationError` - 서명/형식 오류, 만료, 폐기된 토큰, 종료된 세션의 토큰
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self.codec.decode(access_token)?;

        if self.blacklist.is_revoked(access_token).await? {
            log::warn!("폐기된 토큰 사용 시도: fp={}", fingerprint(access_token));
            return Err(AppError::AuthenticationError("폐기된 토큰입니다".to_string()));
        }

        if let Some(session_id) = claims.session_id() {
            if self.sessions.is_terminated(session_id).await? {
                log::warn!("종료된 세션의 토큰 사용 시도: session={}", session_id);
                return Err(AppError::AuthenticationError("종료된 세션입니다".to_string()));
            }
        }

        Ok(AuthenticatedUser {
            role: claims.role().map(str::to_string),
            session_id: claims.session_id().map(str::to_string),
            subject: claims.sub,
            user_id: claims.user_id,
            access_token: access_token.to_string(),
        })
    }

    /// 로그아웃. 같은 토큰으로 여러 번 호출해도 에러가 나지 않습니다.
    ///
    /// 빈 토큰은 아무 일도 하지 않습니다. 서명이 맞는 토큰이면 그 세션의 리프레시 토큰을 바로 삭제하고
    /// 세션 종료 이벤트를 발행합니다.
    pub async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Ok(());
        }
        if access_token.split('.').count() != 3 {
            log::debug!("JWT 형식이 아닌 토큰의 로그아웃 요청 무시");
            return Ok(());
        }

        self.blacklist.revoke(access_token).await?;

        if let Ok(claims) = self.codec.decode_allow_expired(access_token) {
            if let Some(session_id) = claims.session_id() {
                self.refresh_tokens.revoke_for_session(session_id).await?;
            }
            if let Err(e) = self.csrf.discard(&claims.sub).await {
                log::warn!("로그아웃 CSRF 토큰 정리 실패: {}", e);
            }
            self.publish(AuthEvent::LoggedOut {
                user_id: claims.user_id,
                session_id: claims.session_id().map(str::to_string),
            });
        }
        Ok(())
    }

    /// 현재 토큰을 폐기하고 사용자의 모든 세션과 리프레시 토큰을 끝냅니다.
    pub async fn logout_all(&self, user: &AuthenticatedUser) -> Result<u64, AppError> {
        self.blacklist.revoke(&user.access_token).await?;
        self.refresh_tokens.revoke_all_for_user(user.user_id).await?;
        self.csrf.discard(&user.subject).await?;
        self.sessions.terminate_all_sessions(user.user_id).await
    }

    /// 사용자의 세션 하나를 종료하고 그 세션의 리프레시 토큰을 삭제합니다.
    /// 종료된 세션의 액세스 토큰은 [`authenticate`](Self::authenticate)에서 거부됩니다.
    ///
    /// # Errors
    ///
    /// * `AppError::SessionNotFound` - 세션이 없거나 다른 사용자의 세션
    pub async fn terminate_session(&self, user_id: i64, session_id: &str) -> Result<(), AppError> {
        self.sessions.terminate_session(user_id, session_id).await?;
        self.refresh_tokens.revoke_for_session(session_id).await?;
        Ok(())
    }

    /// 사용자의 모든 세션을 종료하고 리프레시 토큰을 전부 삭제합니다. 종료된 세션 수를 반환합니다.
    pub async fn terminate_all_sessions(&self, user_id: i64) -> Result<u64, AppError> {
        self.refresh_tokens.revoke_all_for_user(user_id).await?;
        self.sessions.terminate_all_sessions(user_id).await
    }

    /// 회원 탈퇴
    ///
    /// 현재 토큰을 즉시 폐기하고 회원을 삭제한 뒤, 나머지 정리는 이벤트로 넘깁니다.
    pub async fn delete_account(&self, user: &AuthenticatedUser) -> Result<(), AppError> {
        self.blacklist.revoke(&user.access_token).await?;

        if !self.members.delete_member(user.user_id).await? {
            return Err(AppError::NotFound("회원을 찾을 수 없습니다".to_string()));
        }

        log::info!("회원 탈퇴: user_id={}", user.user_id);
        self.publish(AuthEvent::MemberDeleted(MemberDeletedEvent {
            login_id: user.subject.clone(),
            user_id: user.user_id,
            token: Some(user.access_token.clone()),
        }));
        Ok(())
    }

    pub async fn issue_csrf_token(&self, user: &AuthenticatedUser) -> Result<CsrfTokenResponse, AppError> {
        Ok(CsrfTokenResponse {
            csrf_token: self.csrf.issue_token(&user.subject).await?,
            header_name: CSRF_HEADER,
        })
    }

    /// 이벤트 발행 실패는 요청을 실패시키지 않습니다. 토큰은 이미 폐기된 상태입니다.
    fn publish(&self, event: AuthEvent) {
        if let Err(e) = self.events.publish(event) {
            log::error!("이벤트 발행 실패: {}", e);
        }
    }
}
