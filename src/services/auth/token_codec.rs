//! 액세스 토큰 코덱
//!
//! JSON Web Token의 발급, 서명 검증, 만료 확인을 담당합니다.
//! 기본은 HMAC-SHA256이며, RSA 키 쌍이 설정되면 RS256으로 서명합니다.
//!
//! 만료 확인은 `jsonwebtoken` 내부 시계 대신 주입된 [`Clock`]으로 수행합니다.
//! 허용 오차(leeway)는 0초입니다.

use std::sync::Arc;

use chrono::{DateTime, Duration};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::domain::models::token::{ExtraClaims, TokenClaims};
use crate::errors::AppError;
use crate::utils::clock::Clock;
use crate::utils::string_utils::validate_required_string;

/// 추가 클레임으로 덮어쓸 수 없는 예약 클레임
const RESERVED_CLAIMS: [&str; 6] = ["sub", "user_id", "iat", "exp", "jti", "iss"];

/// JWT 발급/검증기
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// HMAC-SHA256 코덱을 생성합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::ConfigurationError` - 비밀 키가 비어 있음
    pub fn with_secret(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::ConfigurationError(
                "JWT 서명 키가 비어 있습니다".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            issuer: None,
            clock,
        })
    }

    /// RS256 코덱을 PEM 키 쌍으로 생성합니다.
    pub fn with_rsa_pem(private_pem: &str, public_pem: &str, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AppError::ConfigurationError(format!("RSA 개인 키 파싱 실패: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AppError::ConfigurationError(format!("RSA 공개 키 파싱 실패: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm: Algorithm::RS256,
            issuer: None,
            clock,
        })
    }

    /// 환경 설정으로 코덱을 생성합니다. RSA 키 쌍이 있으면 RS256, 없으면 `JWT_SECRET`.
    pub fn from_config(clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let codec = match JwtConfig::rsa_key_pair_pem() {
            Some((private_pem, public_pem)) => Self::with_rsa_pem(&private_pem, &public_pem, clock)?,
            None => Self::with_secret(&JwtConfig::secret()?, clock)?,
        };
        Ok(codec.with_issuer(JwtConfig::issuer()))
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// 서명된 토큰을 발급합니다. 만료 시각은 `now + ttl`입니다.
    ///
    /// `extra_claims`의 예약 클레임(`sub`, `exp` 등)은 무시됩니다.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mut extra = ExtraClaims::new();
    /// extra.insert("role".into(), "ROLE_USER".into());
    /// let token = codec.issue("u1", 1, extra, Duration::minutes(15))?;
    /// assert!(codec.validate(&token));
    /// ```
    pub fn issue(
        &self,
        subject: &str,
        user_id: i64,
        mut extra_claims: ExtraClaims,
        ttl: Duration,
    ) -> Result<String, AppError> {
        validate_required_string(subject, "subject")?;

        for reserved in RESERVED_CLAIMS {
            extra_claims.remove(reserved);
        }

        let now = self.clock.now();
        let claims = TokenClaims {
            sub: subject.to_string(),
            user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            extra: extra_claims,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("JWT 토큰 생성 실패: {}", e)))
    }

    /// 서명과 만료를 확인합니다. 어떤 실패도 `false`로 돌려줍니다.
    pub fn validate(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }

    /// 서명과 만료를 확인하고 클레임을 반환합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::AuthenticationError` - 형식/서명 오류 또는 만료
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AppError> {
        let claims = self.decode_allow_expired(token)?;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AppError::AuthenticationError("토큰이 만료되었습니다".to_string()));
        }
        Ok(claims)
    }

    /// 유효한 토큰의 subject를 반환합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::TokenParseError` - 검증에 실패한 토큰
    pub fn get_subject(&self, token: &str) -> Result<String, AppError> {
        self.decode(token)
            .map(|claims| claims.sub)
            .map_err(|_| AppError::TokenParseError("토큰에서 사용자 정보를 읽을 수 없습니다".to_string()))
    }

    /// 서명이 유효한 토큰의 만료 시각을 반환합니다. 이미 만료된 토큰도 허용합니다.
    ///
    /// 블랙리스트 TTL 계산에 사용됩니다.
    pub fn expires_at(&self, token: &str) -> Result<DateTime<chrono::Utc>, AppError> {
        self.decode_allow_expired(token)
            .map(|claims| claims.expires_at())
            .map_err(|_| AppError::TokenParseError("토큰 만료 시각을 읽을 수 없습니다".to_string()))
    }

    /// 서명만 확인하고 만료는 무시합니다. 로그아웃처럼 만료 직후 토큰도 다뤄야 하는 곳에서 씁니다.
    pub fn decode_allow_expired(&self, token: &str) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => {
                    AppError::AuthenticationError("토큰 서명이 올바르지 않습니다".to_string())
                }
                _ => AppError::AuthenticationError("유효하지 않은 토큰입니다".to_string()),
            })
    }
}

/// `Authorization` 헤더에서 Bearer 토큰 부분을 추출합니다.
///
/// 접두사는 대소문자를 구분하지 않습니다.
///
/// # Errors
///
/// * `AppError::AuthenticationError` - 잘못된 헤더 형식 또는 빈 토큰
pub fn extract_bearer_token(auth_header: &str) -> Result<&str, AppError> {
    let header = auth_header.trim();
    let token = match header.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => header[7..].trim(),
        _ => {
            return Err(AppError::AuthenticationError(
                "유효하지 않은 인증 헤더 형식입니다".to_string(),
            ))
        }
    };

    if token.is_empty() {
        return Err(AppError::AuthenticationError("토큰이 비어 있습니다".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::token::{ROLE_CLAIM, SESSION_ID_CLAIM};
    use crate::utils::clock::ManualClock;
    use serde_json::Value;

    fn codec(clock: Arc<ManualClock>) -> TokenCodec {
        TokenCodec::with_secret("test-secret-key-for-hamalog", clock).unwrap()
    }

    #[test]
    fn test_blank_secret_fails_fast() {
        let clock = Arc::new(ManualClock::starting_now());
        assert!(matches!(
            TokenCodec::with_secret("  ", clock),
            Err(AppError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_token_valid_until_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock.clone());

        let token = codec.issue("u1", 1, ExtraClaims::new(), Duration::minutes(15)).unwrap();
        assert!(codec.validate(&token));

        clock.advance(Duration::minutes(14));
        assert!(codec.validate(&token));

        clock.advance(Duration::minutes(1));
        assert!(!codec.validate(&token));
    }

    #[test]
    fn test_claims_roundtrip_with_extra_claims() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock);
        let mut extra = ExtraClaims::new();
        extra.insert(ROLE_CLAIM.to_string(), Value::from("ROLE_USER"));
        extra.insert(SESSION_ID_CLAIM.to_string(), Value::from("s-1"));
        extra.insert("sub".to_string(), Value::from("attacker"));

        let token = codec.issue("u1", 7, extra, Duration::minutes(15)).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role(), Some("ROLE_USER"));
        assert_eq!(claims.session_id(), Some("s-1"));
        assert_eq!(codec.get_subject(&token).unwrap(), "u1");
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock.clone());
        let token = codec.issue("u1", 1, ExtraClaims::new(), Duration::minutes(15)).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = parts[1].clone();
        parts[1] = payload.chars().rev().collect();
        assert!(!codec.validate(&parts.join(".")));

        let other = TokenCodec::with_secret("another-secret", clock).unwrap();
        assert!(!other.validate(&token));
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock);

        for input in ["", "abc", "a.b.c", "....", "Bearer x"] {
            assert!(!codec.validate(input));
            assert!(matches!(codec.get_subject(input), Err(AppError::TokenParseError(_))));
        }
    }

    #[test]
    fn test_get_subject_fails_for_expired_token() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec(clock.clone());
        let token = codec.issue("u1", 1, ExtraClaims::new(), Duration::minutes(1)).unwrap();

        clock.advance(Duration::minutes(2));

        assert!(matches!(codec.get_subject(&token), Err(AppError::TokenParseError(_))));
        assert!(codec.expires_at(&token).is_ok());
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let clock = Arc::new(ManualClock::starting_now());
        let issuing = codec(clock.clone()).with_issuer(Some("hamalog".to_string()));
        let strict = codec(clock.clone()).with_issuer(Some("someone-else".to_string()));

        let token = issuing.issue("u1", 1, ExtraClaims::new(), Duration::minutes(5)).unwrap();

        assert!(issuing.validate(&token));
        assert!(!strict.validate(&token));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(extract_bearer_token("bearer abc").unwrap(), "abc");
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("Bearer   ").is_err());
        assert!(extract_bearer_token("").is_err());
    }
}
