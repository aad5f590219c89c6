//! 리프레시 토큰 저장소
//!
//! 회전의 핵심은 [`RefreshTokenRepository::mark_rotated_if_active`]입니다.
//! "아직 회전되지 않았고 만료되지 않은 토큰"이라는 조건과 회전 표시를 한 번의
//! 조건부 쓰기로 처리하므로, 같은 값에 대한 동시 회전 중 정확히 하나만 성공합니다.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::domain::entities::RefreshToken;
use crate::errors::AppError;

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError>;

    /// 활성 토큰이면 원자적으로 회전 표시하고 회전 후 레코드를 반환합니다.
    /// 없거나, 만료됐거나, 이미 회전된 토큰이면 `None`입니다.
    async fn mark_rotated_if_active(
        &self,
        token_value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError>;

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError>;

    /// 세션에 묶인 토큰을 모두 삭제합니다. 회전으로 이어진 토큰도 같은 세션 ID를 가집니다.
    async fn delete_for_session(&self, session_id: &str) -> Result<u64, AppError>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

pub(crate) fn to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub(crate) fn from_bson(dt: BsonDateTime) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(dt.timestamp_millis()).single().unwrap_or_default()
}

/// MongoDB `refresh_tokens` 컬렉션 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshTokenDocument {
    #[serde(rename = "_id")]
    id: String,
    owner_user_id: i64,
    token_value: String,
    created_at: BsonDateTime,
    expires_at: BsonDateTime,
    rotated_at: Option<BsonDateTime>,
    #[serde(default)]
    session_id: Option<String>,
}

impl From<&RefreshToken> for RefreshTokenDocument {
    fn from(token: &RefreshToken) -> Self {
        Self {
            id: token.id.clone(),
            owner_user_id: token.owner_user_id,
            token_value: token.token_value.clone(),
            created_at: to_bson(token.created_at),
            expires_at: to_bson(token.expires_at),
            rotated_at: token.rotated_at.map(to_bson),
            session_id: token.session_id.clone(),
        }
    }
}

impl From<RefreshTokenDocument> for RefreshToken {
    fn from(doc: RefreshTokenDocument) -> Self {
        Self {
            id: doc.id,
            owner_user_id: doc.owner_user_id,
            token_value: doc.token_value,
            created_at: from_bson(doc.created_at),
            expires_at: from_bson(doc.expires_at),
            rotated_at: doc.rotated_at.map(from_bson),
            session_id: doc.session_id,
        }
    }
}

pub struct MongoRefreshTokenRepository {
    collection: Collection<RefreshTokenDocument>,
}

impl MongoRefreshTokenRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.get_database().collection("refresh_tokens"),
        }
    }

    /// 토큰 값 유니크 인덱스, 소유자 인덱스, 만료 TTL 인덱스를 생성합니다.
    pub async fn create_indexes(&self) -> Result<(), AppError> {
        let token_value_index = IndexModel::builder()
            .keys(doc! { "token_value": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("token_value_unique".to_string())
                .build())
            .build();

        let owner_index = IndexModel::builder()
            .keys(doc! { "owner_user_id": 1 })
            .options(IndexOptions::builder()
                .name("owner_user_id".to_string())
                .build())
            .build();

        let session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(IndexOptions::builder()
                .sparse(true)
                .name("session_id".to_string())
                .build())
            .build();

        let expiry_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(IndexOptions::builder()
                .expire_after(std::time::Duration::from_secs(0))
                .name("expires_at_ttl".to_string())
                .build())
            .build();

        self.collection
            .create_indexes([token_value_index, owner_index, session_index, expiry_index])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MongoRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError> {
        self.collection
            .insert_one(RefreshTokenDocument::from(token))
            .await?;
        Ok(())
    }

    async fn mark_rotated_if_active(
        &self,
        token_value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let rotated = self.collection
            .find_one_and_update(
                doc! {
                    "token_value": token_value,
                    "rotated_at": null,
                    "expires_at": { "$gt": to_bson(now) },
                },
                doc! { "$set": { "rotated_at": to_bson(now) } },
            )
            .with_options(options)
            .await?;

        Ok(rotated.map(RefreshToken::from))
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let result = self.collection
            .delete_many(doc! { "owner_user_id": user_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_for_session(&self, session_id: &str) -> Result<u64, AppError> {
        let result = self.collection
            .delete_many(doc! { "session_id": session_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = self.collection
            .delete_many(doc! { "expires_at": { "$lte": to_bson(now) } })
            .await?;
        Ok(result.deleted_count)
    }
}

/// 메모리 기반 구현 (개발/테스트용)
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_value(&self, token_value: &str) -> Option<RefreshToken> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token_value)
            .cloned()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(&token.token_value) {
            return Err(AppError::ConflictError("중복된 리프레시 토큰 값입니다".to_string()));
        }
        tokens.insert(token.token_value.clone(), token.clone());
        Ok(())
    }

    async fn mark_rotated_if_active(
        &self,
        token_value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        match tokens.get_mut(token_value) {
            Some(token) if token.is_active(now) => {
                token.rotated_at = Some(now);
                Ok(Some(token.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, token| token.owner_user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_for_session(&self, session_id: &str) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, token| token.session_id.as_deref() != Some(session_id));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(value: &str, owner: i64, expires_at: DateTime<Utc>) -> RefreshToken {
        RefreshToken {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner,
            token_value: value.to_string(),
            created_at: expires_at - Duration::days(7),
            expires_at,
            rotated_at: None,
            session_id: None,
        }
    }

    #[test]
    fn test_bson_conversion_keeps_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        assert_eq!(from_bson(to_bson(now)), now);
    }

    #[tokio::test]
    async fn test_mark_rotated_only_once() {
        let repo = InMemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.insert(&token("r1", 1, now + Duration::days(7))).await.unwrap();

        assert!(repo.mark_rotated_if_active("r1", now).await.unwrap().is_some());
        assert!(repo.mark_rotated_if_active("r1", now).await.unwrap().is_none());
        assert!(repo.mark_rotated_if_active("missing", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_rotated() {
        let repo = InMemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.insert(&token("old", 1, now - Duration::seconds(1))).await.unwrap();

        assert!(repo.mark_rotated_if_active("old", now).await.unwrap().is_none());
        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let repo = InMemoryRefreshTokenRepository::new();
        let expires = Utc::now() + Duration::days(1);
        repo.insert(&token("a", 1, expires)).await.unwrap();
        repo.insert(&token("b", 1, expires)).await.unwrap();
        repo.insert(&token("c", 2, expires)).await.unwrap();

        assert_eq!(repo.delete_all_for_user(1).await.unwrap(), 2);
        assert!(repo.find_by_value("c").is_some());
    }

    #[tokio::test]
    async fn test_delete_for_session_leaves_other_sessions() {
        let repo = InMemoryRefreshTokenRepository::new();
        let expires = Utc::now() + Duration::days(1);
        let mut first = token("a", 1, expires);
        first.session_id = Some("s1".to_string());
        let mut rotated = token("b", 1, expires);
        rotated.session_id = Some("s1".to_string());
        let mut other = token("c", 1, expires);
        other.session_id = Some("s2".to_string());
        for t in [&first, &rotated, &other, &token("d", 1, expires)] {
            repo.insert(t).await.unwrap();
        }

        assert_eq!(repo.delete_for_session("s1").await.unwrap(), 2);
        assert!(repo.find_by_value("c").is_some());
        assert!(repo.find_by_value("d").is_some());
        assert_eq!(repo.delete_for_session("s1").await.unwrap(), 0);
    }
}
