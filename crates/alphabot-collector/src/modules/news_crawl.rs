//! 네이버 금융 뉴스 크롤링 모듈.

use alphabot_data::naver_news::{normalize_date, parse_categories};
use alphabot_data::{save_news_csv, NaverNewsCrawler};
use chrono::{Duration, NaiveDate};
use std::path::PathBuf;
use std::time::Instant;

use crate::{CollectionStats, Result};

/// 크롤링 옵션
#[derive(Debug, Clone)]
pub struct NewsCrawlOptions {
    /// 시작일 (`YYYYMMDD` 또는 `YYYY-MM-DD`)
    pub start: String,
    /// 종료일
    pub end: String,
    /// 카테고리 목록 (`401,402`), 없으면 전체
    pub categories: Option<String>,
    /// CSV 출력 디렉터리
    pub output_dir: PathBuf,
}

impl NewsCrawlOptions {
    /// 어제~오늘 범위 (데몬 모드)
    pub fn yesterday_and_today(
        today: NaiveDate,
        categories: Option<String>,
        output_dir: PathBuf,
    ) -> Self {
        let yesterday = today - Duration::days(1);
        Self {
            start: yesterday.format("%Y%m%d").to_string(),
            end: today.format("%Y%m%d").to_string(),
            categories,
            output_dir,
        }
    }
}

/// 크롤링 결과
#[derive(Debug)]
pub struct NewsCrawlReport {
    pub stats: CollectionStats,
    /// 저장된 CSV 경로 (기사가 없으면 None)
    pub path: Option<PathBuf>,
}

/// 뉴스 크롤링 후 CSV 저장
pub async fn crawl_news(options: &NewsCrawlOptions) -> Result<NewsCrawlReport> {
    let crawler = NaverNewsCrawler::new()?;
    crawl_news_with(&crawler, options).await
}

/// 주어진 크롤러로 실행
pub async fn crawl_news_with(
    crawler: &NaverNewsCrawler,
    options: &NewsCrawlOptions,
) -> Result<NewsCrawlReport> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    // 파일명에는 정규화된 날짜를 쓴다
    let start_date = normalize_date(&options.start)?;
    let end_date = normalize_date(&options.end)?;
    let categories = parse_categories(options.categories.as_deref())?;

    tracing::info!(
        start = %start_date,
        end = %end_date,
        categories = categories.len(),
        output_dir = %options.output_dir.display(),
        "뉴스 크롤링 시작"
    );

    let articles = crawler.crawl(&start_date, &end_date, &categories).await?;
    stats.total = articles.len();
    stats.success = articles.len();
    stats.saved_rows = articles.len();
    if articles.is_empty() {
        stats.empty = 1;
    }

    let path = save_news_csv(&options.output_dir, &start_date, &end_date, articles)?;

    stats.elapsed = start.elapsed();
    Ok(NewsCrawlReport { stats, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphabot_data::naver_news::CrawlDelays;
    use alphabot_data::NewsCrawlerConfig;
    use mockito::Matcher;

    fn crawler_for(server: &mockito::ServerGuard) -> NaverNewsCrawler {
        NaverNewsCrawler::with_config(NewsCrawlerConfig {
            finance_base: server.url(),
            news_base: server.url(),
            timeout: std::time::Duration::from_secs(5),
            delays: CrawlDelays::none(),
        })
        .unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("alphabot_news_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_yesterday_and_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let options = NewsCrawlOptions::yesterday_and_today(today, None, PathBuf::from("."));
        assert_eq!(options.start, "20250228");
        assert_eq!(options.end, "20250301");
    }

    #[tokio::test]
    async fn test_invalid_date_is_config_error() {
        let server = mockito::Server::new_async().await;
        let options = NewsCrawlOptions {
            start: "2025/11/01".into(),
            end: "20251101".into(),
            categories: None,
            output_dir: temp_dir("invalid"),
        };

        let err = crawl_news_with(&crawler_for(&server), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::CollectorError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_category_is_config_error() {
        let server = mockito::Server::new_async().await;
        let options = NewsCrawlOptions {
            start: "20251101".into(),
            end: "20251101".into(),
            categories: Some("401,999".into()),
            output_dir: temp_dir("category"),
        };

        let err = crawl_news_with(&crawler_for(&server), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::CollectorError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_crawl_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/news/news_list.naver")
            .match_query(Matcher::Any)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body><ul class=\"realtimeNewsList\"></ul></body></html>")
            .create_async()
            .await;

        let output_dir = temp_dir("empty");
        let options = NewsCrawlOptions {
            start: "2025-11-01".into(),
            end: "2025-11-01".into(),
            categories: Some("401".into()),
            output_dir: output_dir.clone(),
        };

        let report = crawl_news_with(&crawler_for(&server), &options)
            .await
            .unwrap();

        assert!(report.path.is_none());
        assert_eq!(report.stats.total, 0);
        assert_eq!(report.stats.empty, 1);
        assert!(!output_dir.join("naver_finance_news_20251101_20251101.csv").exists());
    }
}
