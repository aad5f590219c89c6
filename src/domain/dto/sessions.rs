//! 세션/로그인 이력 DTO

use serde::Deserialize;

/// 로그인 이력 페이지 조회 쿼리
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    20
}
