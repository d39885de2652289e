//! 기업 스냅샷 (quoteSummary → `stocks` 행).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{YahooClient, YahooError};
use crate::error::{DataError, Result};
use crate::numeric::{
    round_decimal_from_f64, value_as_decimal, value_as_f64, value_as_i32, value_as_i64,
};

/// quoteSummary 모듈 (먼저 나온 모듈의 값이 우선).
const QUOTE_SUMMARY_MODULES: [&str; 5] = [
    "assetProfile",
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
];

/// 평탄화된 종목 정보 (`currentPrice` → 값).
pub type InfoMap = Map<String, Value>;

impl YahooClient {
    /// 종목 정보 조회.
    pub async fn fetch_info(&self, symbol: &str) -> std::result::Result<InfoMap, YahooError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.endpoints().query2,
            symbol
        );
        let payload = self
            .get_json(&url, &[("modules", QUOTE_SUMMARY_MODULES.join(","))], true)
            .await?;

        let info = flatten_quote_summary(&payload).ok_or_else(|| YahooError::NoData {
            symbol: symbol.to_string(),
        })?;
        debug!(symbol, fields = info.len(), "quoteSummary 조회 완료");
        Ok(info)
    }
}

/// quoteSummary 응답을 한 단계 맵으로 평탄화.
///
/// `{"raw": .., "fmt": ..}` 형태는 raw 값만 남기고, 배열과 빈 객체는 버립니다.
pub fn flatten_quote_summary(payload: &Value) -> Option<InfoMap> {
    let result = payload
        .get("quoteSummary")?
        .get("result")?
        .as_array()?
        .first()?;

    let mut info = InfoMap::new();
    for module in QUOTE_SUMMARY_MODULES {
        let Some(fields) = result.get(module).and_then(Value::as_object) else {
            continue;
        };

        for (key, value) in fields {
            let flat = match value {
                Value::Object(obj) => match obj.get("raw") {
                    Some(raw) => raw.clone(),
                    None => continue,
                },
                Value::Array(_) | Value::Null => continue,
                scalar => scalar.clone(),
            };
            info.entry(key.clone()).or_insert(flat);
        }
    }

    Some(info)
}

/// `stocks` 테이블 한 행.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub code: String,

    // 기본 정보
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub full_time_employees: Option<i32>,
    pub business_summary: Option<String>,

    // 시세
    pub current_price: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub market_cap: Option<i64>,
    pub volume: Option<i64>,
    pub average_volume_10d: Option<i64>,

    // 밸류에이션
    pub pe_ratio: Option<Decimal>,
    pub forward_pe: Option<Decimal>,
    pub pbr: Option<Decimal>,
    pub psr: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub forward_eps: Option<Decimal>,
    pub enterprise_value: Option<i64>,
    pub ev_to_revenue: Option<Decimal>,
    pub ev_to_ebitda: Option<Decimal>,

    // 재무 건전성
    pub profit_margins: Option<Decimal>,
    pub operating_margins: Option<Decimal>,
    pub gross_margins: Option<Decimal>,
    pub roa: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub total_debt: Option<i64>,
    pub total_cash: Option<i64>,
    pub debt_to_equity: Option<Decimal>,
    pub free_cashflow: Option<i64>,
    pub revenue_growth: Option<Decimal>,
    pub earnings_growth: Option<Decimal>,

    // 가격 변동
    pub week52_high: Option<Decimal>,
    pub week52_low: Option<Decimal>,
    pub fifty_day_average: Option<Decimal>,
    pub two_hundred_day_average: Option<Decimal>,
    pub beta: Option<Decimal>,

    // 배당
    pub dividend_rate: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub payout_ratio: Option<Decimal>,
    pub ex_dividend_date: Option<DateTime<Utc>>,
    pub last_dividend_value: Option<Decimal>,

    // 애널리스트
    pub recommendation: Option<String>,
    pub target_mean_price: Option<Decimal>,
    pub target_high_price: Option<Decimal>,
    pub target_low_price: Option<Decimal>,
    pub number_of_analyst_opinions: Option<i32>,
}

fn text(info: &InfoMap, key: &str) -> Option<String> {
    match info.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn decimal(info: &InfoMap, key: &str) -> Option<Decimal> {
    info.get(key).and_then(value_as_decimal)
}

fn bigint(info: &InfoMap, key: &str) -> Option<i64> {
    info.get(key).and_then(value_as_i64)
}

fn integer(info: &InfoMap, key: &str) -> Option<i32> {
    info.get(key).and_then(value_as_i32)
}

fn epoch_seconds(info: &InfoMap, key: &str) -> Option<DateTime<Utc>> {
    let secs = info.get(key).and_then(value_as_f64)?;
    DateTime::from_timestamp(secs as i64, 0)
}

impl CompanySnapshot {
    /// 평탄화된 종목 정보를 컬럼에 매핑.
    pub fn from_info(code: &str, info: &InfoMap) -> Self {
        Self {
            code: code.to_uppercase(),

            company_name: text(info, "longName"),
            sector: text(info, "sector"),
            industry: text(info, "industry"),
            country: text(info, "country"),
            website: text(info, "website"),
            full_time_employees: integer(info, "fullTimeEmployees"),
            business_summary: text(info, "longBusinessSummary"),

            current_price: decimal(info, "currentPrice")
                .or_else(|| decimal(info, "regularMarketPrice")),
            previous_close: decimal(info, "previousClose"),
            open_price: decimal(info, "open"),
            day_high: decimal(info, "dayHigh"),
            day_low: decimal(info, "dayLow"),
            market_cap: bigint(info, "marketCap"),
            volume: bigint(info, "volume"),
            average_volume_10d: bigint(info, "averageDailyVolume10Day"),

            pe_ratio: decimal(info, "trailingPE"),
            forward_pe: decimal(info, "forwardPE"),
            pbr: decimal(info, "priceToBook"),
            psr: decimal(info, "priceToSalesTrailing12Months"),
            eps: decimal(info, "trailingEps"),
            forward_eps: decimal(info, "forwardEps"),
            enterprise_value: bigint(info, "enterpriseValue"),
            ev_to_revenue: decimal(info, "enterpriseToRevenue"),
            ev_to_ebitda: decimal(info, "enterpriseToEbitda"),

            profit_margins: decimal(info, "profitMargins"),
            operating_margins: decimal(info, "operatingMargins"),
            gross_margins: decimal(info, "grossMargins"),
            roa: decimal(info, "returnOnAssets"),
            roe: decimal(info, "returnOnEquity"),
            total_debt: bigint(info, "totalDebt"),
            total_cash: bigint(info, "totalCash"),
            debt_to_equity: decimal(info, "debtToEquity"),
            free_cashflow: bigint(info, "freeCashflow"),
            revenue_growth: decimal(info, "revenueGrowth"),
            earnings_growth: decimal(info, "earningsGrowth"),

            week52_high: decimal(info, "fiftyTwoWeekHigh"),
            week52_low: decimal(info, "fiftyTwoWeekLow"),
            fifty_day_average: decimal(info, "fiftyDayAverage"),
            two_hundred_day_average: decimal(info, "twoHundredDayAverage"),
            beta: decimal(info, "beta"),

            dividend_rate: decimal(info, "dividendRate"),
            dividend_yield: decimal(info, "dividendYield"),
            payout_ratio: decimal(info, "payoutRatio"),
            ex_dividend_date: epoch_seconds(info, "exDividendDate"),
            last_dividend_value: decimal(info, "lastDividendValue"),

            recommendation: text(info, "recommendationKey"),
            target_mean_price: decimal(info, "targetMeanPrice"),
            target_high_price: decimal(info, "targetHighPrice"),
            target_low_price: decimal(info, "targetLowPrice"),
            number_of_analyst_opinions: integer(info, "numberOfAnalystOpinions"),
        }
    }

    /// 시세/거래량/52주 필드가 하나라도 비어 있는지
    pub fn needs_price_backfill(&self) -> bool {
        self.current_price.is_none()
            || self.previous_close.is_none()
            || self.open_price.is_none()
            || self.day_high.is_none()
            || self.day_low.is_none()
            || self.volume.is_none()
            || self.average_volume_10d.is_none()
            || self.week52_high.is_none()
            || self.week52_low.is_none()
    }

    /// 일봉 이력으로 빈 필드 보충 (이미 있는 값은 유지).
    pub fn backfill_from_history(&mut self, bars: &[PriceBar]) {
        let Some(last) = bars.last() else {
            return;
        };

        if self.current_price.is_none() {
            self.current_price = round_decimal_from_f64(last.close);
        }
        if self.previous_close.is_none() && bars.len() >= 2 {
            self.previous_close = round_decimal_from_f64(bars[bars.len() - 2].close);
        }
        if self.open_price.is_none() {
            self.open_price = round_decimal_from_f64(last.open);
        }
        if self.day_high.is_none() {
            self.day_high = round_decimal_from_f64(last.high);
        }
        if self.day_low.is_none() {
            self.day_low = round_decimal_from_f64(last.low);
        }
        if self.volume.is_none() {
            self.volume = i64::try_from(last.volume).ok();
        }
        if self.average_volume_10d.is_none() {
            let recent: Vec<u64> = bars.iter().rev().take(10).map(|b| b.volume).collect();
            let avg = recent.iter().sum::<u64>() / recent.len() as u64;
            self.average_volume_10d = i64::try_from(avg).ok();
        }

        // 52주 고저가
        if self.week52_high.is_none() {
            self.week52_high = bars
                .iter()
                .map(|b| b.high)
                .filter(|v| v.is_finite())
                .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .and_then(round_decimal_from_f64);
        }
        if self.week52_low.is_none() {
            self.week52_low = bars
                .iter()
                .map(|b| b.low)
                .filter(|v| v.is_finite())
                .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .and_then(round_decimal_from_f64);
        }
    }
}

/// 일봉 한 개.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// `yahoo_finance_api` 기반 1년 일봉 조회기.
pub struct PriceHistoryFetcher {
    connector: yahoo_finance_api::YahooConnector,
}

impl PriceHistoryFetcher {
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }

    /// 최근 1년 일봉 (오래된 순).
    pub async fn fetch_year(&self, symbol: &str) -> Result<Vec<PriceBar>> {
        let response = self
            .connector
            .get_quote_range(symbol, "1d", "1y")
            .await
            .map_err(|e| DataError::FetchError(format!("일봉 조회 실패 ({}): {}", symbol, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::ParseError(format!("Quote 파싱 오류: {}", e)))?;

        Ok(quotes
            .iter()
            .map(|q| PriceBar {
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "sector": "Technology",
                        "industry": "Consumer Electronics",
                        "country": "United States",
                        "website": "https://www.apple.com",
                        "fullTimeEmployees": 164000,
                        "longBusinessSummary": "Apple Inc. designs smartphones.",
                        "companyOfficers": [{ "name": "Tim" }]
                    },
                    "price": {
                        "longName": "Apple Inc.",
                        "regularMarketPrice": { "raw": 189.98, "fmt": "189.98" },
                        "marketCap": { "raw": 2950000000000i64, "fmt": "2.95T" }
                    },
                    "summaryDetail": {
                        "previousClose": { "raw": 188.5 },
                        "trailingPE": { "raw": 29.123456 },
                        "dividendYield": { "raw": 0.0051 },
                        "exDividendDate": { "raw": 1699574400, "fmt": "2023-11-10" },
                        "marketCap": { "raw": 1 },
                        "forwardPE": {}
                    },
                    "defaultKeyStatistics": {
                        "priceToBook": { "raw": 47.1 },
                        "enterpriseToEbitda": { "raw": "NaN" }
                    },
                    "financialData": {
                        "recommendationKey": "buy",
                        "numberOfAnalystOpinions": { "raw": 38 },
                        "totalDebt": { "raw": 111088000000i64 }
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_flatten_prefers_first_module() {
        let info = flatten_quote_summary(&sample_payload()).unwrap();

        assert_eq!(info["marketCap"], json!(2950000000000i64));
        assert_eq!(info["sector"], json!("Technology"));
        assert!(!info.contains_key("companyOfficers"));
        assert!(!info.contains_key("forwardPE"));
    }

    #[test]
    fn test_flatten_without_result() {
        let payload = json!({ "quoteSummary": { "result": [], "error": { "code": "Not Found" } } });
        assert!(flatten_quote_summary(&payload).is_none());
    }

    #[test]
    fn test_snapshot_mapping() {
        let info = flatten_quote_summary(&sample_payload()).unwrap();
        let snapshot = CompanySnapshot::from_info("aapl", &info);

        assert_eq!(snapshot.code, "AAPL");
        assert_eq!(snapshot.company_name.as_deref(), Some("Apple Inc."));
        assert_eq!(snapshot.full_time_employees, Some(164000));
        // currentPrice가 없으면 regularMarketPrice 사용
        assert_eq!(snapshot.current_price, Some(dec!(189.98)));
        assert_eq!(snapshot.pe_ratio, Some(dec!(29.1235)));
        assert_eq!(snapshot.market_cap, Some(2950000000000));
        assert_eq!(snapshot.ev_to_ebitda, None);
        assert_eq!(snapshot.forward_pe, None);
        assert_eq!(snapshot.recommendation.as_deref(), Some("buy"));
        assert_eq!(snapshot.number_of_analyst_opinions, Some(38));
        assert_eq!(
            snapshot.ex_dividend_date.map(|d| d.to_rfc3339()),
            Some("2023-11-10T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_backfill_only_missing_fields() {
        let mut snapshot = CompanySnapshot {
            code: "AAPL".to_string(),
            current_price: Some(dec!(200)),
            ..Default::default()
        };
        let bars = vec![
            PriceBar { open: 10.0, high: 15.0, low: 9.0, close: 12.0, volume: 100 },
            PriceBar { open: 12.0, high: 20.0, low: 11.0, close: 18.0, volume: 300 },
        ];

        assert!(snapshot.needs_price_backfill());
        snapshot.backfill_from_history(&bars);

        assert_eq!(snapshot.current_price, Some(dec!(200)));
        assert_eq!(snapshot.previous_close, Some(dec!(12)));
        assert_eq!(snapshot.open_price, Some(dec!(12)));
        assert_eq!(snapshot.volume, Some(300));
        assert_eq!(snapshot.average_volume_10d, Some(200));
        assert_eq!(snapshot.week52_high, Some(dec!(20)));
        assert_eq!(snapshot.week52_low, Some(dec!(9)));
        assert!(!snapshot.needs_price_backfill());
    }
}
