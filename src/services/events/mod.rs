//! 인증 이벤트 발행과 비동기 정리
//!
//! 요청 경로는 이벤트를 채널에 넣고 바로 응답합니다. [`AuthEventHandler`]가 별도 태스크에서
//! 블랙리스트 마무리, 세션 종료, 리프레시 토큰 폐기를 처리합니다.
//! 핸들러 내부의 에러와 panic은 로그로만 남고 루프를 멈추지 않습니다.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;

use crate::domain::events::{AuthEvent, MemberDeletedEvent};
use crate::errors::AppError;
use crate::services::auth::{RefreshTokenStore, TokenBlacklist};
use crate::services::security::CsrfGuard;
use crate::services::sessions::SessionTracker;

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AuthEvent) -> Result<(), AppError>;
}

/// tokio unbounded 채널 기반 발행기
#[derive(Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::UnboundedSender<AuthEvent>,
}

impl ChannelEventPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuthEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelEventPublisher {
    fn publish(&self, event: AuthEvent) -> Result<(), AppError> {
        let name = event.name();
        self.sender
            .send(event)
            .map_err(|_| AppError::InternalError(format!("이벤트 채널이 닫혔습니다: {}", name)))?;
        log::debug!("이벤트 발행: {}", name);
        Ok(())
    }
}

pub struct AuthEventHandler {
    blacklist: Arc<TokenBlacklist>,
    sessions: Arc<SessionTracker>,
    refresh_tokens: Arc<RefreshTokenStore>,
    csrf: Arc<CsrfGuard>,
}

impl AuthEventHandler {
    pub fn new(
        blacklist: Arc<TokenBlacklist>,
        sessions: Arc<SessionTracker>,
        refresh_tokens: Arc<RefreshTokenStore>,
        csrf: Arc<CsrfGuard>,
    ) -> Self {
        Self {
            blacklist,
            sessions,
            refresh_tokens,
            csrf,
        }
    }

    pub async fn handle(&self, event: &AuthEvent) -> Result<(), AppError> {
        match event {
            AuthEvent::MemberDeleted(event) => self.on_member_deleted(event).await,
            AuthEvent::LoggedOut { user_id, session_id } => {
                if let Some(session_id) = session_id {
                    let count = self.sessions.terminate_session_by_id(session_id).await?;
                    log::debug!("로그아웃 세션 정리: user_id={}, count={}", user_id, count);
                }
                Ok(())
            }
        }
    }

    async fn on_member_deleted(&self, event: &MemberDeletedEvent) -> Result<(), AppError> {
        if let Some(token) = &event.token {
            self.blacklist.revoke(token).await?;
        }
        self.refresh_tokens.revoke_all_for_user(event.user_id).await?;
        self.sessions.terminate_all_sessions(event.user_id).await?;
        self.sessions.delete_history_for_user(event.user_id).await?;
        self.csrf.discard(&event.login_id).await?;
        log::info!("회원 탈퇴 정리 완료: user_id={}", event.user_id);
        Ok(())
    }

    /// 채널이 닫힐 때까지 이벤트를 처리합니다.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<AuthEvent>) {
        while let Some(event) = receiver.recv().await {
            match AssertUnwindSafe(self.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("이벤트 처리 실패: {}: {}", event.name(), e),
                Err(_) => log::error!("이벤트 처리 중 panic: {}", event.name()),
            }
        }
        log::info!("이벤트 핸들러 종료");
    }
}
