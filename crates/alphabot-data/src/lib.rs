//! AlphaBot 데이터 수집 및 저장.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Yahoo Finance 기업 스냅샷/재무제표/미국 전체 종목 조회
//! - 네이버 금융 뉴스 크롤링
//! - PostgreSQL `stocks` / `financial_statements` 저장
//! - 뉴스 CSV 출력

pub mod error;
pub mod numeric;
pub mod provider;
pub mod storage;
pub mod throttle;

pub use error::{DataError, Result};
pub use provider::*;
pub use storage::*;
pub use throttle::Jitter;
