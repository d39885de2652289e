//! 종목 코드 정규화.
//!
//! 채팅방, 댓글, 수집기에서 공통으로 사용하는 종목 코드 규칙입니다.
//! 공백을 모두 제거하고 대문자로 바꾼 뒤 `[A-Z0-9.-]{1,20}` 형식만 허용합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 종목 코드 최대 길이
pub const MAX_STOCK_CODE_LEN: usize = 20;

/// 종목 코드 검증 에러.
///
/// 메시지는 API 응답 본문에 그대로 노출됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockCodeError {
    #[error("stock_code is empty")]
    Empty,
    #[error("stock_code must be 20 chars or fewer")]
    TooLong,
    #[error("stock_code contains invalid characters")]
    InvalidCharacters,
}

/// 정규화된 종목 코드 (예: "AAPL", "BRK-B", "005930.KS").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

impl StockCode {
    /// 입력 문자열을 정규화하고 검증합니다.
    ///
    /// ```
    /// use alphabot_core::StockCode;
    ///
    /// let code = StockCode::normalize(" brk-b ").unwrap();
    /// assert_eq!(code.as_str(), "BRK-B");
    /// ```
    pub fn normalize(raw: &str) -> Result<Self, StockCodeError> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();

        if normalized.is_empty() {
            return Err(StockCodeError::Empty);
        }
        if normalized.chars().count() > MAX_STOCK_CODE_LEN {
            return Err(StockCodeError::TooLong);
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
        {
            return Err(StockCodeError::InvalidCharacters);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StockCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StockCode {
    type Error = StockCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<StockCode> for String {
    fn from(code: StockCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for StockCode {
    type Err = StockCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_and_uppercases() {
        assert_eq!(StockCode::normalize("aapl").unwrap().as_str(), "AAPL");
        assert_eq!(StockCode::normalize(" b r k - b\t").unwrap().as_str(), "BRK-B");
        assert_eq!(
            StockCode::normalize("005930.ks").unwrap().as_str(),
            "005930.KS"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(StockCode::normalize(""), Err(StockCodeError::Empty));
        assert_eq!(StockCode::normalize("   \n"), Err(StockCodeError::Empty));
    }

    #[test]
    fn test_normalize_length_limit() {
        assert!(StockCode::normalize(&"A".repeat(20)).is_ok());
        assert_eq!(
            StockCode::normalize(&"A".repeat(21)),
            Err(StockCodeError::TooLong)
        );
    }

    #[test]
    fn test_normalize_rejects_invalid_characters() {
        assert_eq!(
            StockCode::normalize("AAPL$"),
            Err(StockCodeError::InvalidCharacters)
        );
        assert_eq!(
            StockCode::normalize("삼성전자"),
            Err(StockCodeError::InvalidCharacters)
        );
        assert_eq!(
            StockCode::normalize("A/B"),
            Err(StockCodeError::InvalidCharacters)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(StockCodeError::Empty.to_string(), "stock_code is empty");
        assert_eq!(
            StockCodeError::TooLong.to_string(),
            "stock_code must be 20 chars or fewer"
        );
        assert_eq!(
            StockCodeError::InvalidCharacters.to_string(),
            "stock_code contains invalid characters"
        );
    }

    #[test]
    fn test_serde_normalizes() {
        let code: StockCode = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(code.as_str(), "MSFT");
        assert!(serde_json::from_str::<StockCode>("\"\"").is_err());
    }
}
