//! 로그인 이력/세션 저장소 모듈

pub mod login_history_repository;

pub use login_history_repository::{
    InMemoryLoginHistoryRepository, LoginHistoryRepository, MongoLoginHistoryRepository,
};
