//! 레이트 리밋 카운터 저장소 모듈

pub mod rate_limit_store;

pub use rate_limit_store::{
    InMemoryRateLimitStore, RateLimitStore, RedisRateLimitStore, RATE_LIMIT_KEY_PREFIX,
};
