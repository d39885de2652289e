//! 네이버 금융 뉴스포커스 크롤러.
//!
//! 카테고리 → 날짜(최근 순) → 페이지 순서로 리스트를 순회하고,
//! 기사 본문 페이지에서 제목/날짜/본문을 추출합니다.
//!
//! ## 요청 정책
//! - 네트워크 오류: 3~5초 대기 후 건너뜀
//! - 429: 60~90초 대기 후 건너뜀
//! - 5xx: 5~15초 대기 후 건너뜀
//! - 그 외 400 이상: 건너뜀

pub mod parse;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::throttle::Jitter;

pub use parse::{
    canonical_url, category_by_section, date_range, normalize_date, ArticleDetail, ArticleLink,
    NewsCategory, CATEGORIES,
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// 뉴스 크롤러 에러
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("HTTP 클라이언트 생성 실패: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("날짜 형식은 'YYYYMMDD' 또는 'YYYY-MM-DD'만 지원합니다: {0}")]
    InvalidDate(String),

    #[error("요청 실패: {0}")]
    RequestFailed(String),

    #[error("알 수 없는 카테고리: {0}")]
    UnknownCategory(String),
}

impl From<NewsError> for crate::error::DataError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::InvalidDate(_) | NewsError::UnknownCategory(_) => {
                crate::error::DataError::InvalidData(err.to_string())
            }
            other => crate::error::DataError::FetchError(other.to_string()),
        }
    }
}

/// 수집된 기사 한 건 (CSV 한 행).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: u64,
    pub category: String,
    pub date: String,
    pub title: String,
    pub content: String,
    pub url: String,
}

/// 대기 시간 설정.
#[derive(Debug, Clone, Copy)]
pub struct CrawlDelays {
    pub per_article: Jitter,
    pub per_date: Jitter,
    pub per_category: Jitter,
    pub network_error: Jitter,
    pub rate_limited: Jitter,
    pub server_error: Jitter,
}

impl Default for CrawlDelays {
    fn default() -> Self {
        Self {
            per_article: Jitter::new(0.3, 0.8),
            per_date: Jitter::new(2.0, 4.0),
            per_category: Jitter::new(5.0, 10.0),
            network_error: Jitter::new(3.0, 5.0),
            rate_limited: Jitter::new(60.0, 90.0),
            server_error: Jitter::new(5.0, 15.0),
        }
    }
}

impl CrawlDelays {
    /// 대기 없음 (테스트용)
    pub fn none() -> Self {
        Self {
            per_article: Jitter::none(),
            per_date: Jitter::none(),
            per_category: Jitter::none(),
            network_error: Jitter::none(),
            rate_limited: Jitter::none(),
            server_error: Jitter::none(),
        }
    }
}

/// 크롤러 설정.
#[derive(Debug, Clone)]
pub struct NewsCrawlerConfig {
    /// 리스트 페이지 도메인
    pub finance_base: String,
    /// 기사 페이지 도메인
    pub news_base: String,
    pub timeout: Duration,
    pub delays: CrawlDelays,
}

impl Default for NewsCrawlerConfig {
    fn default() -> Self {
        Self {
            finance_base: "https://finance.naver.com".to_string(),
            news_base: "https://n.news.naver.com".to_string(),
            timeout: Duration::from_secs(10),
            delays: CrawlDelays::default(),
        }
    }
}

/// 네이버 금융 뉴스 크롤러.
pub struct NaverNewsCrawler {
    client: Client,
    config: NewsCrawlerConfig,
}

/// 응답 본문 디코딩 방식.
#[derive(Debug, Clone, Copy)]
enum Encoding {
    EucKr,
    Utf8,
}

impl NaverNewsCrawler {
    pub fn new() -> Result<Self, NewsError> {
        Self::with_config(NewsCrawlerConfig::default())
    }

    pub fn with_config(config: NewsCrawlerConfig) -> Result<Self, NewsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// GET 요청 후 본문 반환. 실패 시 정책에 따라 대기하고 None.
    async fn safe_get(&self, url: &str, encoding: Encoding) -> Option<String> {
        let mut request = self.client.get(url);
        if matches!(encoding, Encoding::Utf8) {
            request = request.header(REFERER, &self.config.finance_base);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "요청 실패");
                self.config.delays.network_error.sleep().await;
                return None;
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url, "429 Too Many Requests, 대기 후 건너뜀");
            self.config.delays.rate_limited.sleep().await;
            return None;
        }
        if status.is_server_error() {
            warn!(url, status = status.as_u16(), "서버 에러, 대기 후 건너뜀");
            self.config.delays.server_error.sleep().await;
            return None;
        }
        if status.as_u16() >= 400 {
            warn!(url, status = status.as_u16(), "HTTP 에러");
            return None;
        }

        let body = match encoding {
            Encoding::EucKr => response.text_with_charset("euc-kr").await,
            Encoding::Utf8 => response.text_with_charset("utf-8").await,
        };
        match body {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(url, error = %e, "본문 읽기 실패");
                None
            }
        }
    }

    fn list_url(&self, section_id: u32, date: &str, page: u32) -> String {
        format!(
            "{}{}",
            self.config.finance_base.trim_end_matches('/'),
            parse::list_path(section_id, date, page)
        )
    }

    /// 해당 날짜의 마지막 페이지 번호 (첫 페이지 요청 실패 시 1).
    pub async fn last_page(&self, category: NewsCategory, date: &str) -> u32 {
        let url = self.list_url(category.section_id, date, 1);
        match self.safe_get(&url, Encoding::EucKr).await {
            Some(html) => parse::parse_last_page(&html),
            None => {
                warn!(date, category = category.name, "첫 페이지 요청 실패, 1페이지로 가정");
                1
            }
        }
    }

    /// 리스트 한 페이지의 기사 링크.
    pub async fn list_articles(
        &self,
        category: NewsCategory,
        date: &str,
        page: u32,
    ) -> Result<Vec<ArticleLink>, NewsError> {
        let url = self.list_url(category.section_id, date, page);
        let html = self
            .safe_get(&url, Encoding::EucKr)
            .await
            .ok_or_else(|| NewsError::RequestFailed(url.clone()))?;

        let links =
            parse::parse_article_links(&html, &self.config.finance_base, &self.config.news_base);
        debug!(url, count = links.len(), "리스트 기사 추출");
        Ok(links)
    }

    /// 기사 상세 (canonical 주소로 요청).
    pub async fn article_detail(&self, url: &str) -> Result<ArticleDetail, NewsError> {
        let news_url = canonical_url(url);
        let html = self
            .safe_get(&news_url, Encoding::Utf8)
            .await
            .ok_or_else(|| NewsError::RequestFailed(news_url.clone()))?;
        Ok(parse::parse_article_detail(&html))
    }

    /// 날짜 범위 전체 크롤링.
    ///
    /// 중복 기준은 `카테고리|canonical URL`이며, 반환 순서는 수집 순서입니다.
    pub async fn crawl(
        &self,
        start: &str,
        end: &str,
        categories: &[NewsCategory],
    ) -> Result<Vec<NewsArticle>, NewsError> {
        let dates = date_range(start, end)?;
        info!(
            start = dates.first().map(String::as_str).unwrap_or_default(),
            end = dates.last().map(String::as_str).unwrap_or_default(),
            days = dates.len(),
            "뉴스 크롤링 시작"
        );

        let delays = self.config.delays;
        let mut visited: HashSet<String> = HashSet::new();
        let mut articles = Vec::new();
        let mut next_id: u64 = 1;

        for category in categories {
            info!(category = category.name, "카테고리 처리");

            for date in dates.iter().rev() {
                let last_page = self.last_page(*category, date).await;
                debug!(date = %date, last_page, "날짜 처리");

                for page in 1..=last_page {
                    let links = match self.list_articles(*category, date, page).await {
                        Ok(links) => links,
                        Err(e) => {
                            warn!(date = %date, page, error = %e, "리스트 수집 실패");
                            continue;
                        }
                    };

                    for link in links {
                        let canonical = canonical_url(&link.url);
                        if !visited.insert(format!("{}|{}", category.name, canonical)) {
                            continue;
                        }

                        let detail = match self.article_detail(&link.url).await {
                            Ok(detail) => detail,
                            Err(e) => {
                                warn!(url = %link.url, error = %e, "기사 크롤링 실패, 건너뜀");
                                continue;
                            }
                        };

                        let title = if detail.title.is_empty() {
                            link.title
                        } else {
                            detail.title
                        };

                        articles.push(NewsArticle {
                            id: next_id,
                            category: category.name.to_string(),
                            date: detail.date,
                            title,
                            content: detail.content,
                            url: canonical,
                        });
                        next_id += 1;

                        delays.per_article.sleep().await;
                    }
                }

                delays.per_date.sleep().await;
            }

            delays.per_category.sleep().await;
        }

        info!(count = articles.len(), "뉴스 크롤링 완료");
        Ok(articles)
    }
}

/// `401,402` 형식의 카테고리 목록 파싱 (비어 있으면 전체).
pub fn parse_categories(raw: Option<&str>) -> Result<Vec<NewsCategory>, NewsError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(CATEGORIES.to_vec());
    };

    let mut selected = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let category = part
            .parse::<u32>()
            .ok()
            .and_then(category_by_section)
            .ok_or_else(|| NewsError::UnknownCategory(part.to_string()))?;
        if !selected.contains(&category) {
            selected.push(category);
        }
    }

    // 출력 정렬과 같은 순서로 순회
    selected.sort_by_key(|c| parse::category_rank(c.name));
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn crawler_for(server: &mockito::ServerGuard) -> NaverNewsCrawler {
        NaverNewsCrawler::with_config(NewsCrawlerConfig {
            finance_base: server.url(),
            news_base: server.url(),
            timeout: Duration::from_secs(5),
            delays: CrawlDelays::none(),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(parse_categories(None).unwrap().len(), 6);
        assert_eq!(parse_categories(Some("  ")).unwrap().len(), 6);

        let selected = parse_categories(Some("429, 401,401")).unwrap();
        let ids: Vec<u32> = selected.iter().map(|c| c.section_id).collect();
        assert_eq!(ids, vec![401, 429]);

        assert!(matches!(
            parse_categories(Some("999")),
            Err(NewsError::UnknownCategory(ref id)) if id == "999"
        ));
        assert!(parse_categories(Some("abc")).is_err());
    }

    #[tokio::test]
    async fn test_crawl_single_day_dedups_and_falls_back_to_list_title() {
        let mut server = mockito::Server::new_async().await;

        let list_html = r#"<html><body>
            <ul class="realtimeNewsList"><li><dl>
              <dd class="articleSubject"><a href="/mnews/article/001/0001" title="리스트 제목">리스트 제목</a></dd>
              <dd class="articleSubject"><a href="/mnews/article/001/0001">중복 기사</a></dd>
              <dd class="articleSubject"><a href="/mnews/article/001/0002">두번째 기사</a></dd>
            </dl></li></ul>
        </body></html>"#;

        let _list = server
            .mock("GET", "/news/news_list.naver")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("section_id3".into(), "401".into()),
                Matcher::UrlEncoded("date".into(), "20251110".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(list_html)
            .create_async()
            .await;

        let _first = server
            .mock("GET", "/mnews/article/001/0001")
            .with_body(r#"<span class="_ARTICLE_DATE_TIME" data-date-time="2025-11-10 09:00:00"></span><article id="dic_area">본문1</article>"#)
            .expect(1)
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/mnews/article/001/0002")
            .with_body(r#"<h2 class="media_end_head_headline">상세 제목</h2><article id="dic_area">본문2</article>"#)
            .create_async()
            .await;

        let crawler = crawler_for(&server);
        let categories = parse_categories(Some("401")).unwrap();
        let articles = crawler
            .crawl("20251110", "2025-11-10", &categories)
            .await
            .unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "리스트 제목");
        assert_eq!(articles[0].date, "2025-11-10 09:00:00");
        assert_eq!(articles[0].content, "본문1");
        assert_eq!(articles[0].category, "시황/전망");
        assert_eq!(articles[1].id, 2);
        assert_eq!(articles[1].title, "상세 제목");
    }

    #[tokio::test]
    async fn test_rate_limited_list_yields_no_articles() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/news/news_list.naver")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let crawler = crawler_for(&server);
        let categories = parse_categories(Some("402")).unwrap();
        let articles = crawler
            .crawl("20251110", "20251110", &categories)
            .await
            .unwrap();

        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected() {
        let crawler = NaverNewsCrawler::new().unwrap();
        let err = crawler.crawl("2025/11/10", "20251110", &CATEGORIES).await;
        assert!(matches!(err, Err(NewsError::InvalidDate(_))));
    }
}
