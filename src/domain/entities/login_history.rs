//! 로그인 이력 엔티티
//!
//! 성공/실패를 포함한 모든 로그인 시도를 기록합니다.
//! 생성 이후에는 세션 종료 시 `active`가 `false`로 바뀌는 것 외에는 변경되지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    Success,
    Failure,
}

/// User-Agent로 분류한 기기 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Bot,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginHistoryRecord {
    pub id: String,
    pub user_id: i64,
    /// 로그인마다 새로 발급되는 세션 ID
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub device_type: DeviceType,
    pub status: LoginStatus,
    pub failure_reason: Option<String>,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub active: bool,
}

/// 활성 세션 조회 결과
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActiveSession {
    pub session_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub device_type: DeviceType,
    pub login_time: DateTime<Utc>,
    /// 요청을 보낸 세션인지 여부
    pub is_current: bool,
}

impl ActiveSession {
    pub fn from_record(record: LoginHistoryRecord, current_session_id: Option<&str>) -> Self {
        let is_current = current_session_id == Some(record.session_id.as_str());
        Self {
            session_id: record.session_id,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            device_type: record.device_type,
            login_time: record.login_time,
            is_current,
        }
    }
}

/// 페이지 단위 조회 결과
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}
