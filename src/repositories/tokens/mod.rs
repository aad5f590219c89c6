//! 토큰 저장소 모듈
//!
//! - [`blacklist_store`] - 폐기된 액세스 토큰 (Redis + 메모리 대체)
//! - [`refresh_token_repository`] - 회전 방식 리프레시 토큰 (MongoDB / 메모리)

pub mod blacklist_store;
pub mod refresh_token_repository;

pub use blacklist_store::{
    blacklist_key, FallbackRevocationStore, InMemoryRevocationStore, RedisRevocationStore,
    RevocationStore,
};
pub use refresh_token_repository::{
    InMemoryRefreshTokenRepository, MongoRefreshTokenRepository, RefreshTokenRepository,
};
