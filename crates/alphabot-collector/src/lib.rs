//! AlphaBot 독립 실행형 데이터 수집기.
//!
//! API 서버와 별도로 실행되는 바이너리를 제공합니다:
//! - 미국 종목 스냅샷 및 재무제표 수집 (Yahoo Finance)
//! - 네이버 금융 뉴스 크롤링 (CSV 출력)
//! - 데몬 모드 주기 실행

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
