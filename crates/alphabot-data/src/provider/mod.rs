//! 외부 데이터 소스.
//!
//! - [`yahoo`]: 미국 종목 스냅샷, 재무제표, 전체 종목 목록
//! - [`naver_news`]: 네이버 금융 뉴스포커스
//! - [`tickers`]: CSV 종목 목록

pub mod naver_news;
pub mod tickers;
pub mod yahoo;

pub use naver_news::{NaverNewsCrawler, NewsArticle, NewsCrawlerConfig, NewsError};
pub use tickers::{chunk_size, read_tickers_csv, to_yahoo_symbol, DEFAULT_SP500_CSV};
pub use yahoo::{YahooClient, YahooEndpoints, YahooError};
