pub mod csrf_token_store;

pub use csrf_token_store::{CsrfTokenStore, InMemoryCsrfTokenStore, RedisCsrfTokenStore};
