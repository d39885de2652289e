//! Yahoo Finance 클라이언트.
//!
//! quoteSummary(기업 스냅샷), fundamentals-timeseries(재무제표),
//! predefined screener(미국 전체 종목) 엔드포인트를 사용합니다.
//!
//! quoteSummary는 쿠키 + crumb 인증이 필요합니다.
//! 1. `fc.yahoo.com` 요청으로 세션 쿠키를 받고
//! 2. `/v1/test/getcrumb`로 crumb 문자열을 얻어
//! 3. 이후 요청에 `crumb` 쿼리 파라미터로 붙입니다.

pub mod screener;
pub mod snapshot;
pub mod statements;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::DataError;

pub use screener::{fetch_us_universe, DEFAULT_SCREENER_PAGE_SIZE};
pub use snapshot::{CompanySnapshot, InfoMap, PriceBar, PriceHistoryFetcher};
pub use statements::{FinancialStatementRow, StatementFrame, StatementSet};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Yahoo Finance 에러
#[derive(Debug, Error)]
pub enum YahooError {
    #[error("HTTP 요청 실패: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} 응답: {url}")]
    Status { status: u16, url: String },

    #[error("crumb 발급 실패: {0}")]
    Crumb(String),

    #[error("응답 파싱 실패: {0}")]
    ParseError(String),

    #[error("데이터 없음: {symbol}")]
    NoData { symbol: String },
}

impl From<YahooError> for DataError {
    fn from(err: YahooError) -> Self {
        match err {
            YahooError::ParseError(msg) => DataError::ParseError(msg),
            YahooError::NoData { symbol } => DataError::NotFound(symbol),
            YahooError::Crumb(msg) => DataError::ConnectionError(msg),
            other => DataError::FetchError(other.to_string()),
        }
    }
}

/// 엔드포인트 기본 주소 (테스트에서 목 서버로 교체).
#[derive(Debug, Clone)]
pub struct YahooEndpoints {
    pub query1: String,
    pub query2: String,
    pub cookie_url: String,
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            query1: "https://query1.finance.yahoo.com".to_string(),
            query2: "https://query2.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
        }
    }
}

impl YahooEndpoints {
    /// 모든 호스트를 하나의 주소로 지정.
    pub fn single(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            query1: base.clone(),
            query2: base.clone(),
            cookie_url: format!("{}/cookie", base),
        }
    }
}

/// Yahoo Finance HTTP 클라이언트.
///
/// 쿠키 저장소를 켠 reqwest 클라이언트와 발급받은 crumb를 함께 보관합니다.
pub struct YahooClient {
    client: Client,
    endpoints: YahooEndpoints,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new() -> Result<Self, YahooError> {
        Self::with_endpoints(YahooEndpoints::default())
    }

    pub fn with_endpoints(endpoints: YahooEndpoints) -> Result<Self, YahooError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            endpoints,
            crumb: Mutex::new(None),
        })
    }

    pub fn endpoints(&self) -> &YahooEndpoints {
        &self.endpoints
    }

    /// 캐시된 crumb 반환, 없으면 새로 발급.
    async fn crumb(&self) -> Result<String, YahooError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // 쿠키 발급용 요청은 404를 돌려줘도 Set-Cookie는 내려온다
        if let Err(e) = self.client.get(&self.endpoints.cookie_url).send().await {
            warn!(error = %e, "Yahoo 쿠키 요청 실패");
        }

        let url = format!("{}/v1/test/getcrumb", self.endpoints.query2);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(YahooError::Crumb(format!("HTTP {}", response.status())));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(YahooError::Crumb("빈 crumb 응답".to_string()));
        }

        debug!("Yahoo crumb 발급 완료");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    /// JSON GET 요청.
    ///
    /// `with_crumb`이면 crumb를 붙이고, 401/403이면 crumb를 재발급해 한 번 더 시도합니다.
    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        with_crumb: bool,
    ) -> Result<Value, YahooError> {
        if !with_crumb {
            return send_json(self.client.get(url).query(query), url).await;
        }

        for attempt in 0..2 {
            let crumb = self.crumb().await?;
            let result = send_json(
                self.client
                    .get(url)
                    .query(query)
                    .query(&[("crumb", crumb.as_str())]),
                url,
            )
            .await;

            match result {
                Err(YahooError::Status { status, .. })
                    if attempt == 0 && (status == 401 || status == 403) =>
                {
                    warn!(status, "Yahoo 인증 만료, crumb 재발급");
                    self.invalidate_crumb().await;
                }
                other => return other,
            }
        }

        Err(YahooError::Crumb("crumb 재발급 후에도 인증 실패".to_string()))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

/// 요청 전송 후 상태 코드 확인 및 JSON 파싱.
pub(crate) async fn send_json(request: RequestBuilder, url: &str) -> Result<Value, YahooError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(YahooError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| YahooError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crumb_is_fetched_once_and_attached() {
        let mut server = mockito::Server::new_async().await;
        let cookie = server
            .mock("GET", "/cookie")
            .with_status(404)
            .with_header("set-cookie", "A3=d=abc; Path=/")
            .create_async()
            .await;
        let crumb = server
            .mock("GET", "/v1/test/getcrumb")
            .with_status(200)
            .with_body("abcCRUMB")
            .expect(1)
            .create_async()
            .await;
        let data = server
            .mock("GET", "/data")
            .match_query(mockito::Matcher::UrlEncoded(
                "crumb".into(),
                "abcCRUMB".into(),
            ))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(2)
            .create_async()
            .await;

        let client = YahooClient::with_endpoints(YahooEndpoints::single(&server.url())).unwrap();
        let url = format!("{}/data", server.url());

        let first = client.get_json(&url, &[], true).await.unwrap();
        let second = client.get_json(&url, &[], true).await.unwrap();

        assert_eq!(first["ok"], true);
        assert_eq!(second["ok"], true);
        cookie.assert_async().await;
        crumb.assert_async().await;
        data.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = YahooClient::with_endpoints(YahooEndpoints::single(&server.url())).unwrap();
        let url = format!("{}/missing", server.url());

        let err = client.get_json(&url, &[], false).await.unwrap_err();
        assert!(matches!(err, YahooError::Status { status: 404, .. }));
    }
}
