//! # 문자열 유틸리티
//!
//! 문자열 처리와 관련된 공통 유틸리티 함수들입니다.

use crate::errors::AppError;

/// 응답/로그에 값을 노출하면 안 되는 파라미터 키워드
const SENSITIVE_KEYWORDS: [&str; 5] = ["password", "token", "secret", "key", "credential"];

/// 필수 문자열 필드 검증 및 정리
///
/// 빈 문자열이나 공백만 있는 경우 ValidationError를 반환하고,
/// 유효한 문자열인 경우 앞뒤 공백을 제거한 문자열을 반환합니다.
///
/// # 예제
/// ```rust,ignore
/// use crate::utils::string_utils::validate_required_string;
///
/// assert_eq!(validate_required_string("  hamalog  ", "loginId").unwrap(), "hamalog");
/// assert!(validate_required_string("   ", "loginId").is_err());
/// ```
pub fn validate_required_string(value: &str, field_name: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            format!("{}은(는) 필수입니다", field_name)
        ));
    }
    Ok(trimmed.to_string())
}

/// `None`이거나 공백뿐인 문자열을 `None`으로 정리합니다.
pub fn clean_optional_str(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// 메시지 안의 민감한 `key=value` / `key: value` 쌍의 값을 마스킹합니다.
///
/// 키 이름에 password, token, secret, key, credential 중 하나가 포함되면
/// 값 부분이 `***`로 대체됩니다. 키워드가 없는 일반 문장은 그대로 유지됩니다.
///
/// # 예제
/// ```rust,ignore
/// assert_eq!(redact_sensitive("password=abc retry"), "password=*** retry");
/// assert_eq!(redact_sensitive("refresh_token: xyz"), "refresh_token: ***");
/// ```
pub fn redact_sensitive(message: &str) -> String {
    let mut redacted: Vec<String> = Vec::new();
    let mut mask_next = false;

    for word in message.split(' ') {
        if mask_next && !word.is_empty() {
            redacted.push("***".to_string());
            mask_next = false;
            continue;
        }

        if let Some((key, _)) = word.split_once('=') {
            if is_sensitive_key(key) {
                redacted.push(format!("{}=***", key));
                continue;
            }
        }

        if let Some(key) = word.strip_suffix(':') {
            if is_sensitive_key(key) {
                mask_next = true;
            }
        } else if let Some((key, value)) = word.split_once(':') {
            if is_sensitive_key(key) && !value.is_empty() {
                redacted.push(format!("{}:***", key));
                continue;
            }
        }

        redacted.push(word.to_string());
    }

    redacted.join(" ")
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|keyword| key.contains(keyword))
}
