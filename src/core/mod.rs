//! # Core Module
//!
//! 애플리케이션 조립을 담당합니다. 서비스 그래프는 [`container::AppContainer`]가
//! 시작 시 한 번 만들고, 이후에는 `Arc`로 공유됩니다.

pub mod container;

pub use container::{AppContainer, MaintenanceReport, StorageBackends};
