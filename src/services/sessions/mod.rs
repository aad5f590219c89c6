//! 로그인 이력/세션 서비스

pub mod device;
pub mod session_tracker;

pub use device::classify_device;
pub use session_tracker::SessionTracker;
