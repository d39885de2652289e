//! 저장 계층 (PostgreSQL, CSV 파일).

pub mod database;
pub mod news_csv;
pub mod stocks;

pub use database::{Database, DatabaseConfig};
pub use news_csv::{news_csv_path, save_news_csv, sort_and_renumber, write_news_csv};
pub use stocks::StockStore;
