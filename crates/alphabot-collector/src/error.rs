//! 에러 타입 정의.

use alphabot_data::{DataError, NewsError, YahooError};
use std::fmt;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터베이스 에러
    Database(sqlx::Error),
    /// 설정 에러
    Config(String),
    /// 데이터 소스 에러 (Yahoo, 네이버 금융)
    DataSource(String),
    /// 저장/파싱 등 데이터 계층 에러
    Data(DataError),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::DataSource(msg) => write!(f, "Data source error: {}", msg),
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidData(msg) => Self::Config(msg),
            DataError::ConnectionError(msg) | DataError::FetchError(msg) => Self::DataSource(msg),
            other => Self::Data(other),
        }
    }
}

impl From<YahooError> for CollectorError {
    fn from(err: YahooError) -> Self {
        Self::DataSource(err.to_string())
    }
}

impl From<NewsError> for CollectorError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::InvalidDate(_) | NewsError::UnknownCategory(_) => {
                Self::Config(err.to_string())
            }
            other => Self::DataSource(other.to_string()),
        }
    }
}

impl From<alphabot_core::ConfigError> for CollectorError {
    fn from(err: alphabot_core::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CollectorError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
