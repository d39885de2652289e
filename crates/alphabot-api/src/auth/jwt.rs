//! JWT Access Token 생성/검증.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 로그인 ID
    pub sub: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// `expires_in_minutes` 후 만료되는 Claims 생성.
    pub fn new(login_id: impl Into<String>, expires_in_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: login_id.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(expires_in_minutes)).timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// JWT 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
    #[error("토큰 디코딩 실패")]
    DecodingError,
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("잘못된 토큰 형식")]
    InvalidToken,
}

/// HS256으로 서명한 토큰 생성.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(JwtError::from)
}

/// 로그인 ID로 Access Token 발급.
pub fn issue_access_token(
    login_id: &str,
    secret: &str,
    expires_in_minutes: i64,
) -> Result<String, JwtError> {
    create_token(&Claims::new(login_id, expires_in_minutes), secret)
}

/// 서명과 만료를 검증하고 Claims 반환.
pub fn decode_token(token: &str, secret: &str) -> Result<TokenData<Claims>, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::InvalidToken,
        _ => JwtError::DecodingError,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    #[test]
    fn test_create_and_decode_token() {
        let token = issue_access_token("alice01", TEST_SECRET, 30).unwrap();
        assert!(!token.is_empty());

        let decoded = decode_token(&token, TEST_SECRET).unwrap();
        assert_eq!(decoded.claims.sub, "alice01");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 30 * 60);
        assert!(decoded.claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token() {
        let mut claims = Claims::new("alice01", 30);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = create_token(&claims, TEST_SECRET).unwrap();

        assert!(matches!(
            decode_token(&token, TEST_SECRET),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_invalid_token() {
        assert!(decode_token("invalid.token.here", TEST_SECRET).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_access_token("alice01", TEST_SECRET, 30).unwrap();
        let result = decode_token(&token, "wrong-secret-key-for-testing-minimum-32-chars");
        assert!(result.is_err());
    }
}
