//! 로그인 이력과 활성 세션 관리
//!
//! 모든 로그인 시도는 이력으로 남습니다. 성공한 로그인은 새 세션 ID를 받고,
//! 세션 종료는 해당 이력의 `active`를 `false`로 바꾸는 것으로 표현됩니다.

use std::sync::Arc;

use chrono::Duration;

use crate::config::SessionConfig;
use crate::domain::entities::{ActiveSession, LoginHistoryRecord, LoginStatus, Page};
use crate::errors::AppError;
use crate::repositories::members::UserLookup;
use crate::repositories::sessions::LoginHistoryRepository;
use crate::services::sessions::device::classify_device;
use crate::utils::clock::Clock;

pub struct SessionTracker {
    history: Arc<dyn LoginHistoryRepository>,
    users: Arc<dyn UserLookup>,
    clock: Arc<dyn Clock>,
    max_page_size: u32,
}

impl SessionTracker {
    pub fn new(
        history: Arc<dyn LoginHistoryRepository>,
        users: Arc<dyn UserLookup>,
        clock: Arc<dyn Clock>,
        max_page_size: u32,
    ) -> Self {
        Self {
            history,
            users,
            clock,
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn from_config(
        history: Arc<dyn LoginHistoryRepository>,
        users: Arc<dyn UserLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(history, users, clock, SessionConfig::max_page_size())
    }

    fn record(
        &self,
        user_id: i64,
        ip_address: &str,
        user_agent: &str,
        status: LoginStatus,
        failure_reason: Option<String>,
    ) -> LoginHistoryRecord {
        LoginHistoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            session_id: uuid::Uuid::new_v4().to_string(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            device_type: classify_device(user_agent),
            status,
            failure_reason,
            login_time: self.clock.now(),
            logout_time: None,
            active: status == LoginStatus::Success,
        }
    }

    /// 성공 로그인을 기록하고 새 세션 ID를 반환합니다.
    pub async fn record_success(&self, user_id: i64, ip_address: &str, user_agent: &str) -> Result<String, AppError> {
        let record = self.record(user_id, ip_address, user_agent, LoginStatus::Success, None);
        self.history.insert(&record).await?;
        log::info!("로그인 성공: user_id={}, ip={}, session={}", user_id, ip_address, record.session_id);
        Ok(record.session_id)
    }

    /// 실패 로그인을 기록합니다.
    ///
    /// 존재하지 않는 회원이거나 저장에 실패해도 에러를 돌려주지 않습니다.
    pub async fn record_failure(&self, user_id: i64, ip_address: &str, user_agent: &str, reason: &str) {
        match self.users.find_by_id(user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::debug!("알 수 없는 회원의 로그인 실패는 기록하지 않음: user_id={}", user_id);
                return;
            }
            Err(e) => {
                log::warn!("로그인 실패 기록 중 회원 조회 실패: {}", e);
                return;
            }
        }

        let record = self.record(user_id, ip_address, user_agent, LoginStatus::Failure, Some(reason.to_string()));
        match self.history.insert(&record).await {
            Ok(()) => log::warn!("로그인 실패: user_id={}, ip={}, reason={}", user_id, ip_address, reason),
            Err(e) => log::error!("로그인 실패 이력 저장 실패: user_id={}, {}", user_id, e),
        }
    }

    /// 최신순 이력 페이지. 페이지 크기는 `1..=max_page_size`로 고정됩니다.
    pub async fn list_history(&self, user_id: i64, page: u32, size: u32) -> Result<Page<LoginHistoryRecord>, AppError> {
        let size = size.clamp(1, self.max_page_size);
        let (items, total) = self.history.find_page(user_id, page, size).await?;
        Ok(Page { items, page, size, total })
    }

    pub async fn list_active_sessions(
        &self,
        user_id: i64,
        current_session_id: Option<&str>,
    ) -> Result<Vec<ActiveSession>, AppError> {
        let records = self.history.find_active(user_id).await?;
        Ok(records
            .into_iter()
            .map(|record| ActiveSession::from_record(record, current_session_id))
            .collect())
    }

    /// 사용자 소유의 세션 하나를 종료합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::SessionNotFound` - 세션이 없거나 다른 사용자의 세션
    pub async fn terminate_session(&self, user_id: i64, session_id: &str) -> Result<(), AppError> {
        let owned = self.history.deactivate(user_id, session_id, self.clock.now()).await?;
        if !owned {
            return Err(AppError::SessionNotFound(format!("세션을 찾을 수 없습니다: {}", session_id)));
        }
        log::info!("세션 종료: user_id={}, session={}", user_id, session_id);
        Ok(())
    }

    pub async fn terminate_all_sessions(&self, user_id: i64) -> Result<u64, AppError> {
        let count = self.history.deactivate_all_for_user(user_id, self.clock.now()).await?;
        log::info!("전체 세션 종료: user_id={}, count={}", user_id, count);
        Ok(count)
    }

    /// 기록은 있지만 이미 종료된 세션이면 `true`. 기록이 없는 세션 ID는 종료된 것으로 보지 않습니다.
    pub async fn is_terminated(&self, session_id: &str) -> Result<bool, AppError> {
        Ok(self
            .history
            .find_by_session_id(session_id)
            .await?
            .is_some_and(|record| !record.active))
    }

    /// 소유자 확인 없이 세션을 종료합니다 (관리/이벤트 경로).
    pub async fn terminate_session_by_id(&self, session_id: &str) -> Result<u64, AppError> {
        self.history.deactivate_by_session_id(session_id, self.clock.now()).await
    }

    pub async fn delete_history_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        self.history.delete_all_for_user(user_id).await
    }

    /// 보관 기간이 지난 이력을 삭제합니다.
    pub async fn purge_older_than(&self, retention: Duration) -> Result<u64, AppError> {
        self.history.delete_older_than(self.clock.now() - retention).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DeviceType, Member};
    use crate::repositories::members::InMemoryMemberRepository;
    use crate::repositories::sessions::InMemoryLoginHistoryRepository;
    use crate::utils::clock::ManualClock;

    const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

    struct Fixture {
        clock: Arc<ManualClock>,
        history: Arc<InMemoryLoginHistoryRepository>,
        tracker: SessionTracker,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let history = Arc::new(InMemoryLoginHistoryRepository::new());
        let users = Arc::new(InMemoryMemberRepository::new());
        users.insert(Member::new(1, "alice", None));
        users.insert(Member::new(2, "bob", None));
        let tracker = SessionTracker::new(history.clone(), users, clock.clone(), 100);
        Fixture { clock, history, tracker }
    }

    #[tokio::test]
    async fn test_failure_for_unknown_user_is_skipped() {
        let f = fixture();

        f.tracker.record_failure(999, "10.0.0.1", UA, "bad password").await;

        assert!(f.history.is_empty());
    }

    #[tokio::test]
    async fn test_failure_for_known_user_is_recorded_inactive() {
        let f = fixture();

        f.tracker.record_failure(1, "10.0.0.1", UA, "bad password").await;

        let page = f.tracker.list_history(1, 0, 20).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, LoginStatus::Failure);
        assert_eq!(page.items[0].failure_reason.as_deref(), Some("bad password"));
        assert!(!page.items[0].active);
        assert!(f.tracker.list_active_sessions(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_creates_unique_active_sessions() {
        let f = fixture();
        let first = f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        f.clock.advance(Duration::seconds(1));
        let second = f.tracker.record_success(1, "10.0.0.2", "iPhone Mobile").await.unwrap();
        assert_ne!(first, second);

        let sessions = f.tracker.list_active_sessions(1, Some(&second)).await.unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, second);
        assert!(sessions[0].is_current);
        assert_eq!(sessions[0].device_type, DeviceType::Mobile);
        assert!(!sessions[1].is_current);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let clock = Arc::new(ManualClock::starting_now());
        let history = Arc::new(InMemoryLoginHistoryRepository::new());
        let tracker = SessionTracker::new(history, Arc::new(InMemoryMemberRepository::new()), clock, 3);
        for _ in 0..5 {
            tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        }

        let page = tracker.list_history(1, 0, 10_000).await.unwrap();
        assert_eq!(page.size, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 5);

        let last = tracker.list_history(1, 1, 3).await.unwrap();
        assert_eq!(last.items.len(), 2);

        assert_eq!(tracker.list_history(1, 0, 0).await.unwrap().size, 1);
    }

    #[tokio::test]
    async fn test_terminate_session_checks_ownership() {
        let f = fixture();
        let alice = f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();

        assert!(matches!(
            f.tracker.terminate_session(2, &alice).await,
            Err(AppError::SessionNotFound(_))
        ));
        assert!(matches!(
            f.tracker.terminate_session(1, "missing").await,
            Err(AppError::SessionNotFound(_))
        ));

        f.tracker.terminate_session(1, &alice).await.unwrap();
        assert!(f.tracker.list_active_sessions(1, None).await.unwrap().is_empty());
        f.tracker.terminate_session(1, &alice).await.unwrap();
    }

    #[tokio::test]
    async fn test_is_terminated_tracks_session_state() {
        let f = fixture();
        let session = f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        assert!(!f.tracker.is_terminated(&session).await.unwrap());
        assert!(!f.tracker.is_terminated("unknown").await.unwrap());

        f.tracker.terminate_session(1, &session).await.unwrap();

        assert!(f.tracker.is_terminated(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_bulk_termination_is_idempotent() {
        let f = fixture();
        let s1 = f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();

        assert_eq!(f.tracker.terminate_session_by_id(&s1).await.unwrap(), 1);
        assert_eq!(f.tracker.terminate_session_by_id(&s1).await.unwrap(), 0);
        assert_eq!(f.tracker.terminate_all_sessions(1).await.unwrap(), 1);
        assert_eq!(f.tracker.terminate_all_sessions(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retention_and_account_cleanup() {
        let f = fixture();
        f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        f.clock.advance(Duration::days(91));
        f.tracker.record_success(1, "10.0.0.1", UA).await.unwrap();
        f.tracker.record_success(2, "10.0.0.1", UA).await.unwrap();

        assert_eq!(f.tracker.purge_older_than(Duration::days(90)).await.unwrap(), 1);
        assert_eq!(f.tracker.delete_history_for_user(1).await.unwrap(), 1);
        assert_eq!(f.history.len(), 1);
    }
}
