//! 미국 전체 종목 목록 (predefined screener `universe_us`).

use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{send_json, YahooClient, YahooError};
use crate::throttle::Jitter;

const SCREENER_ID: &str = "universe_us";
const SCREENER_TIMEOUT: Duration = Duration::from_secs(15);

/// 스크리너 페이지 크기 기본값
pub const DEFAULT_SCREENER_PAGE_SIZE: u32 = 250;

/// 페이지 요청 사이 대기 구간
pub const PAGE_JITTER: Jitter = Jitter::new(0.6, 1.5);

/// 스크리너 응답에서 심볼 목록 추출.
///
/// `finance.result`가 비어 있으면 None.
pub fn screener_symbols(payload: &Value) -> Option<Vec<String>> {
    let result = payload
        .get("finance")?
        .get("result")?
        .as_array()?
        .first()?;

    let quotes = result.get("quotes").and_then(Value::as_array)?;

    Some(
        quotes
            .iter()
            .filter_map(|q| q.get("symbol").and_then(Value::as_str))
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// 스크리너를 페이지 단위로 순회하며 미국 종목 심볼 수집.
///
/// 빈 페이지를 만나거나 `limit`개를 모으면 멈추고, 정렬/중복 제거된 목록을 반환합니다.
pub async fn fetch_us_universe(
    client: &YahooClient,
    page_size: u32,
    limit: Option<usize>,
    page_jitter: Jitter,
) -> Result<Vec<String>, YahooError> {
    let page_size = page_size.max(1);
    let url = format!(
        "{}/v1/finance/screener/predefined/saved",
        client.endpoints().query1
    );

    let mut symbols: BTreeSet<String> = BTreeSet::new();
    let mut offset: u32 = 0;

    loop {
        let request = client
            .http()
            .get(&url)
            .timeout(SCREENER_TIMEOUT)
            .query(&[
                ("scrIds", SCREENER_ID.to_string()),
                ("count", page_size.to_string()),
                ("offset", offset.to_string()),
            ]);
        let payload = send_json(request, &url).await?;

        let Some(page) = screener_symbols(&payload) else {
            break;
        };
        if page.is_empty() {
            break;
        }

        let page_len = page.len();
        for symbol in page {
            symbols.insert(symbol);
            if limit.is_some_and(|l| symbols.len() >= l) {
                info!(count = symbols.len(), "스크리너 limit 도달");
                return Ok(symbols.into_iter().collect());
            }
        }

        debug!(offset, page_len, total = symbols.len(), "스크리너 페이지 수집");
        offset += page_size;

        if page_len < page_size as usize {
            break;
        }

        page_jitter.sleep().await;
    }

    info!(count = symbols.len(), "미국 종목 목록 수집 완료");
    Ok(symbols.into_iter().collect())
}
