//! 로그인 이력 저장소
//!
//! 이력은 추가만 되며, 세션 종료 시 `active` 플래그와 `logout_time`만 갱신됩니다.
//! 물리 삭제는 보관 기간 정리와 회원 탈퇴 시에만 일어납니다.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::domain::entities::{DeviceType, LoginHistoryRecord, LoginStatus};
use crate::errors::AppError;
use crate::repositories::tokens::refresh_token_repository::{from_bson, to_bson};

#[async_trait]
pub trait LoginHistoryRepository: Send + Sync {
    async fn insert(&self, record: &LoginHistoryRecord) -> Result<(), AppError>;

    /// 최신순 페이지와 전체 건수
    async fn find_page(&self, user_id: i64, page: u32, size: u32) -> Result<(Vec<LoginHistoryRecord>, u64), AppError>;

    /// 활성 상태인 성공 로그인 (최신순)
    async fn find_active(&self, user_id: i64) -> Result<Vec<LoginHistoryRecord>, AppError>;

    /// 사용자의 특정 세션을 비활성화합니다. 해당 사용자의 세션이 존재하면 `true`.
    async fn deactivate(&self, user_id: i64, session_id: &str, at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn deactivate_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<u64, AppError>;

    /// 세션 ID로 성공 로그인 기록을 찾습니다.
    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<LoginHistoryRecord>, AppError>;

    async fn deactivate_by_session_id(&self, session_id: &str, at: DateTime<Utc>) -> Result<u64, AppError>;

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError>;

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}

/// 사용자가 소유한 성공 로그인 세션
fn owned_session_filter(user_id: i64, session_id: &str) -> Document {
    doc! { "user_id": user_id, "session_id": session_id, "status": "SUCCESS" }
}

/// 아직 종료되지 않은 소유 세션. 이미 종료된 세션의 `logout_time`은 덮어쓰지 않습니다.
fn active_owned_session_filter(user_id: i64, session_id: &str) -> Document {
    let mut filter = owned_session_filter(user_id, session_id);
    filter.insert("active", true);
    filter
}

/// MongoDB `login_history` 컬렉션 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoginHistoryDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: i64,
    session_id: String,
    ip_address: String,
    user_agent: String,
    device_type: DeviceType,
    status: LoginStatus,
    failure_reason: Option<String>,
    login_time: BsonDateTime,
    logout_time: Option<BsonDateTime>,
    active: bool,
}

impl From<&LoginHistoryRecord> for LoginHistoryDocument {
    fn from(record: &LoginHistoryRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id,
            session_id: record.session_id.clone(),
            ip_address: record.ip_address.clone(),
            user_agent: record.user_agent.clone(),
            device_type: record.device_type,
            status: record.status,
            failure_reason: record.failure_reason.clone(),
            login_time: to_bson(record.login_time),
            logout_time: record.logout_time.map(to_bson),
            active: record.active,
        }
    }
}

impl From<LoginHistoryDocument> for LoginHistoryRecord {
    fn from(doc: LoginHistoryDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            session_id: doc.session_id,
            ip_address: doc.ip_address,
            user_agent: doc.user_agent,
            device_type: doc.device_type,
            status: doc.status,
            failure_reason: doc.failure_reason,
            login_time: from_bson(doc.login_time),
            logout_time: doc.logout_time.map(from_bson),
            active: doc.active,
        }
    }
}

pub struct MongoLoginHistoryRepository {
    collection: Collection<LoginHistoryDocument>,
}

impl MongoLoginHistoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.get_database().collection("login_history"),
        }
    }

    pub async fn create_indexes(&self) -> Result<(), AppError> {
        let user_time_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "login_time": -1 })
            .options(IndexOptions::builder()
                .name("user_id_login_time".to_string())
                .build())
            .build();

        let session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("session_id_unique".to_string())
                .build())
            .build();

        self.collection
            .create_indexes([user_time_index, session_index])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LoginHistoryRepository for MongoLoginHistoryRepository {
    async fn insert(&self, record: &LoginHistoryRecord) -> Result<(), AppError> {
        self.collection
            .insert_one(LoginHistoryDocument::from(record))
            .await?;
        Ok(())
    }

    async fn find_page(&self, user_id: i64, page: u32, size: u32) -> Result<(Vec<LoginHistoryRecord>, u64), AppError> {
        let filter = doc! { "user_id": user_id };
        let total = self.collection.count_documents(filter.clone()).await?;

        let documents: Vec<LoginHistoryDocument> = self.collection
            .find(filter)
            .sort(doc! { "login_time": -1 })
            .skip(u64::from(page) * u64::from(size))
            .limit(i64::from(size))
            .await?
            .try_collect()
            .await?;

        Ok((documents.into_iter().map(LoginHistoryRecord::from).collect(), total))
    }

    async fn find_active(&self, user_id: i64) -> Result<Vec<LoginHistoryRecord>, AppError> {
        let documents: Vec<LoginHistoryDocument> = self.collection
            .find(doc! { "user_id": user_id, "active": true, "status": "SUCCESS" })
            .sort(doc! { "login_time": -1 })
            .await?
            .try_collect()
            .await?;

        Ok(documents.into_iter().map(LoginHistoryRecord::from).collect())
    }

    async fn deactivate(&self, user_id: i64, session_id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = self.collection
            .update_one(
                active_owned_session_filter(user_id, session_id),
                doc! { "$set": { "active": false, "logout_time": to_bson(at) } },
            )
            .await?;
        if result.modified_count > 0 {
            return Ok(true);
        }

        let owned = self.collection
            .count_documents(owned_session_filter(user_id, session_id))
            .await?;
        Ok(owned > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<u64, AppError> {
        let result = self.collection
            .update_many(
                doc! { "user_id": user_id, "active": true },
                doc! { "$set": { "active": false, "logout_time": to_bson(at) } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<LoginHistoryRecord>, AppError> {
        let document = self.collection
            .find_one(doc! { "session_id": session_id, "status": "SUCCESS" })
            .await?;
        Ok(document.map(LoginHistoryRecord::from))
    }

    async fn deactivate_by_session_id(&self, session_id: &str, at: DateTime<Utc>) -> Result<u64, AppError> {
        let result = self.collection
            .update_many(
                doc! { "session_id": session_id, "active": true },
                doc! { "$set": { "active": false, "logout_time": to_bson(at) } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let result = self.collection
            .delete_many(doc! { "user_id": user_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = self.collection
            .delete_many(doc! { "login_time": { "$lt": to_bson(cutoff) } })
            .await?;
        Ok(result.deleted_count)
    }
}

/// 메모리 기반 구현 (개발/테스트용)
#[derive(Default)]
pub struct InMemoryLoginHistoryRepository {
    records: RwLock<Vec<LoginHistoryRecord>>,
}

impl InMemoryLoginHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn newest_first<F>(&self, predicate: F) -> Vec<LoginHistoryRecord>
    where
        F: Fn(&LoginHistoryRecord) -> bool,
    {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<LoginHistoryRecord> = records.iter().filter(|r| predicate(r)).cloned().collect();
        matched.sort_by(|a, b| b.login_time.cmp(&a.login_time));
        matched
    }

    fn deactivate_where<F>(&self, at: DateTime<Utc>, predicate: F) -> u64
    where
        F: Fn(&LoginHistoryRecord) -> bool,
    {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let mut modified = 0;
        for record in records.iter_mut().filter(|r| r.active && predicate(r)) {
            record.active = false;
            record.logout_time = Some(at);
            modified += 1;
        }
        modified
    }

    fn delete_where<F>(&self, predicate: F) -> u64
    where
        F: Fn(&LoginHistoryRecord) -> bool,
    {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| !predicate(r));
        (before - records.len()) as u64
    }
}

#[async_trait]
impl LoginHistoryRepository for InMemoryLoginHistoryRepository {
    async fn insert(&self, record: &LoginHistoryRecord) -> Result<(), AppError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    async fn find_page(&self, user_id: i64, page: u32, size: u32) -> Result<(Vec<LoginHistoryRecord>, u64), AppError> {
        let all = self.newest_first(|r| r.user_id == user_id);
        let total = all.len() as u64;
        let skip = (page as usize).saturating_mul(size as usize);
        Ok((all.into_iter().skip(skip).take(size as usize).collect(), total))
    }

    async fn find_active(&self, user_id: i64) -> Result<Vec<LoginHistoryRecord>, AppError> {
        Ok(self.newest_first(|r| r.user_id == user_id && r.active && r.status == LoginStatus::Success))
    }

    async fn deactivate(&self, user_id: i64, session_id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let owned = !self
            .newest_first(|r| r.user_id == user_id && r.session_id == session_id && r.status == LoginStatus::Success)
            .is_empty();
        if owned {
            self.deactivate_where(at, |r| r.user_id == user_id && r.session_id == session_id);
        }
        Ok(owned)
    }

    async fn deactivate_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(self.deactivate_where(at, |r| r.user_id == user_id))
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<LoginHistoryRecord>, AppError> {
        Ok(self
            .newest_first(|r| r.session_id == session_id && r.status == LoginStatus::Success)
            .into_iter()
            .next())
    }

    async fn deactivate_by_session_id(&self, session_id: &str, at: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(self.deactivate_where(at, |r| r.session_id == session_id))
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        Ok(self.delete_where(|r| r.user_id == user_id))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(self.delete_where(|r| r.login_time < cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn success(user_id: i64, session_id: &str, login_time: DateTime<Utc>) -> LoginHistoryRecord {
        LoginHistoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            session_id: session_id.to_string(),
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test".to_string(),
            device_type: DeviceType::Desktop,
            status: LoginStatus::Success,
            failure_reason: None,
            login_time,
            logout_time: None,
            active: true,
        }
    }

    #[test]
    fn test_deactivate_filter_only_matches_active_sessions() {
        let filter = active_owned_session_filter(7, "s-1");

        assert_eq!(filter.get_i64("user_id").unwrap(), 7);
        assert_eq!(filter.get_str("session_id").unwrap(), "s-1");
        assert_eq!(filter.get_str("status").unwrap(), "SUCCESS");
        assert!(filter.get_bool("active").unwrap());
        assert!(!owned_session_filter(7, "s-1").contains_key("active"));
    }

    #[tokio::test]
    async fn test_repeated_deactivate_keeps_first_logout_time() {
        let repo = InMemoryLoginHistoryRepository::new();
        let login = Utc::now();
        repo.insert(&success(1, "s-1", login)).await.unwrap();

        let first = login + Duration::minutes(5);
        assert!(repo.deactivate(1, "s-1", first).await.unwrap());
        assert!(repo.deactivate(1, "s-1", first + Duration::minutes(5)).await.unwrap());
        assert!(!repo.deactivate(2, "s-1", first).await.unwrap());

        let record = repo.find_by_session_id("s-1").await.unwrap().unwrap();
        assert!(!record.active);
        assert_eq!(record.logout_time, Some(first));
    }

    #[tokio::test]
    async fn test_find_by_session_id() {
        let repo = InMemoryLoginHistoryRepository::new();
        repo.insert(&success(1, "s-1", Utc::now())).await.unwrap();

        assert_eq!(repo.find_by_session_id("s-1").await.unwrap().unwrap().user_id, 1);
        assert!(repo.find_by_session_id("missing").await.unwrap().is_none());
    }
}
