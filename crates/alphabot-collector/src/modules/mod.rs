//! 데이터 수집 모듈.

pub mod news_crawl;
pub mod stock_ingest;

pub use news_crawl::{crawl_news, crawl_news_with, NewsCrawlOptions, NewsCrawlReport};
pub use stock_ingest::{
    ingest_stocks, ingest_with, IngestDelays, IngestOptions, StockIngester, TickerData,
    TickerFetch, TickerSource, DEFAULT_TICKER,
};
