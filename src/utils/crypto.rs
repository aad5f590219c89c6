//! 토큰 재료 생성과 해시 유틸리티

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// OS 난수 생성기로 `bytes` 바이트의 URL-safe 토큰을 생성합니다.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// SHA-256 16진수 다이제스트
///
/// 블랙리스트 키처럼 원본 토큰을 저장소에 남기지 않아야 하는 곳에서 사용합니다.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// 로그용 짧은 토큰 지문 (해시 앞 12자리)
pub fn fingerprint(value: &str) -> String {
    sha256_hex(value).chars().take(12).collect()
}

/// 길이 정보 외에는 비교 시간이 입력에 따라 달라지지 않는 문자열 비교
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
