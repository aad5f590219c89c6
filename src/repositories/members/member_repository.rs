//! 회원 조회/삭제 저장소
//!
//! 인증 코어가 회원 도메인에 요구하는 두 가지 협력 인터페이스를 정의하고 구현합니다.
//!
//! - [`UserLookup`] - ID/로그인 아이디로 회원 조회
//! - [`MemberRemoval`] - 회원 탈퇴 시 회원 데이터 삭제

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::db::Database;
use crate::domain::entities::Member;
use crate::errors::AppError;

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<Member>, AppError>;
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Member>, AppError>;
}

#[async_trait]
pub trait MemberRemoval: Send + Sync {
    /// 회원을 삭제합니다. 존재했으면 `true`.
    async fn delete_member(&self, user_id: i64) -> Result<bool, AppError>;
}

pub struct MongoMemberRepository {
    collection: Collection<Member>,
}

impl MongoMemberRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.get_database().collection("members"),
        }
    }

    pub async fn create_indexes(&self) -> Result<(), AppError> {
        let member_id_index = IndexModel::builder()
            .keys(doc! { "member_id": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("member_id_unique".to_string())
                .build())
            .build();

        let login_id_index = IndexModel::builder()
            .keys(doc! { "login_id": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("login_id_unique".to_string())
                .build())
            .build();

        self.collection
            .create_indexes([member_id_index, login_id_index])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserLookup for MongoMemberRepository {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<Member>, AppError> {
        Ok(self.collection.find_one(doc! { "member_id": user_id }).await?)
    }

    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Member>, AppError> {
        Ok(self.collection.find_one(doc! { "login_id": login_id }).await?)
    }
}

#[async_trait]
impl MemberRemoval for MongoMemberRepository {
    async fn delete_member(&self, user_id: i64) -> Result<bool, AppError> {
        let result = self.collection
            .delete_one(doc! { "member_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

/// 메모리 기반 구현 (개발/테스트용)
#[derive(Default)]
pub struct InMemoryMemberRepository {
    members: RwLock<HashMap<i64, Member>>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, member: Member) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(member.member_id, member);
    }
}

#[async_trait]
impl UserLookup for InMemoryMemberRepository {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<Member>, AppError> {
        Ok(self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }

    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Member>, AppError> {
        Ok(self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|m| m.login_id == login_id)
            .cloned())
    }
}

#[async_trait]
impl MemberRemoval for InMemoryMemberRepository {
    async fn delete_member(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
            .is_some())
    }
}
