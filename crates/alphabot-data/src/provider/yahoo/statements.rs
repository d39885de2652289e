//! 재무제표 (fundamentals-timeseries → `financial_statements` 행).
//!
//! 손익계산서/재무상태표/현금흐름표를 항목명 → (기준일 → 값) 프레임으로 만든 뒤,
//! 필드별 후보 항목명을 정규화된 이름으로 매칭해 값을 꺼냅니다.

use alphabot_core::ReportType;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{YahooClient, YahooError};
use crate::numeric::{round_i64_from_f64, value_as_f64};

/// 조회 시작 시점 (2016-12-31 UTC)
const PERIOD_START_EPOCH: i64 = 1_483_142_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sheet {
    Income,
    Balance,
    CashFlow,
}

/// 요청할 timeseries 항목과 소속 재무제표.
const SERIES: &[(&str, Sheet)] = &[
    ("TotalRevenue", Sheet::Income),
    ("GrossProfit", Sheet::Income),
    ("OperatingIncome", Sheet::Income),
    ("EBITDA", Sheet::Income),
    ("NetIncome", Sheet::Income),
    ("NetIncomeCommonStockholders", Sheet::Income),
    ("TotalAssets", Sheet::Balance),
    ("TotalLiabilitiesNetMinorityInterest", Sheet::Balance),
    ("StockholdersEquity", Sheet::Balance),
    ("TotalEquityGrossMinorityInterest", Sheet::Balance),
    ("OperatingCashFlow", Sheet::CashFlow),
    ("InvestingCashFlow", Sheet::CashFlow),
    ("FinancingCashFlow", Sheet::CashFlow),
    ("FreeCashFlow", Sheet::CashFlow),
];

// ==================== 필드별 후보 항목명 ====================

const REVENUE: &[&str] = &[
    "Total Revenue",
    "TotalRevenue",
    "Revenue",
    "SalesRevenueNet",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
];
const GROSS_PROFIT: &[&str] = &["Gross Profit", "GrossProfitIncomeStatement"];
const OPERATING_INCOME: &[&str] = &[
    "Operating Income",
    "OperatingIncome",
    "Operating Income or Loss",
    "OperatingIncomeLoss",
    "OperatingIncomeLossIncomeStatement",
];
const EBITDA: &[&str] = &[
    "EBITDA",
    "Ebitda",
    "EarningsBeforeInterestTaxesDepreciationAmortization",
];
const NET_INCOME: &[&str] = &[
    "Net Income",
    "NetIncome",
    "Net Income Common Stockholders",
    "NetIncomeApplicableToCommonShares",
    "ProfitLoss",
    "NetIncomeLoss",
];
const TOTAL_ASSETS: &[&str] = &["Total Assets", "TotalAssets", "Assets"];
const TOTAL_LIABILITIES: &[&str] = &[
    "Total Liabilities Net Minority Interest",
    "Total Liabilities",
    "TotalLiabilitiesNetMinorityInterest",
    "TotalLiabilities",
    "Liabilities",
];
const TOTAL_EQUITY: &[&str] = &[
    "Total Stockholder Equity",
    "Total equity",
    "TotalEquityGrossMinorityInterest",
    "TotalStockholderEquity",
    "StockholdersEquity",
    "Equity",
];
const OPERATING_CASH_FLOW: &[&str] = &[
    "Operating Cash Flow",
    "OperatingCashFlow",
    "Total Cash From Operating Activities",
    "Net Cash Provided By Operating Activities",
];
const INVESTING_CASH_FLOW: &[&str] = &[
    "Investing Cash Flow",
    "InvestingCashFlow",
    "Total Cashflows From Investing Activities",
    "Net Cash Used For Investing Activities",
];
const FINANCING_CASH_FLOW: &[&str] = &[
    "Financing Cash Flow",
    "FinancingCashFlow",
    "Total Cash From Financing Activities",
    "Net Cash Provided By (Used In) Financing Activities",
];
const FREE_CASH_FLOW: &[&str] = &["Free Cash Flow", "FreeCashFlow"];

/// 항목명 정규화 (소문자 영숫자만).
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 재무제표 한 장: 항목명 → (기준일 → 값).
#[derive(Debug, Clone, Default)]
pub struct StatementFrame {
    rows: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl StatementFrame {
    pub fn insert(&mut self, label: &str, period: NaiveDate, value: f64) {
        self.rows
            .entry(label.to_string())
            .or_default()
            .insert(period, value);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn periods(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.values().flat_map(|values| values.keys().copied())
    }

    /// 후보 중 첫 번째로 일치하는 항목명.
    ///
    /// 모든 후보에 대해 정확 일치를 먼저 시도하고, 없으면 양방향 부분 문자열 일치를 봅니다.
    pub fn find_row(&self, candidates: &[&str]) -> Option<&str> {
        let normalized: Vec<(String, &str)> = self
            .rows
            .keys()
            .map(|label| (normalize_label(label), label.as_str()))
            .collect();

        for candidate in candidates {
            let cand = normalize_label(candidate);
            if let Some((_, label)) = normalized.iter().find(|(norm, _)| *norm == cand) {
                return Some(*label);
            }
        }

        for candidate in candidates {
            let cand = normalize_label(candidate);
            if let Some((_, label)) = normalized
                .iter()
                .find(|(norm, _)| norm.contains(&cand) || cand.contains(norm.as_str()))
            {
                return Some(*label);
            }
        }

        None
    }

    /// 매칭된 항목의 해당 기준일 값.
    pub fn value(&self, candidates: &[&str], period: NaiveDate) -> Option<i64> {
        let label = self.find_row(candidates)?;
        self.rows
            .get(label)?
            .get(&period)
            .copied()
            .and_then(round_i64_from_f64)
    }
}

/// 한 보고 주기의 재무제표 세 장.
#[derive(Debug, Clone, Default)]
pub struct StatementSet {
    pub income: StatementFrame,
    pub balance: StatementFrame,
    pub cashflow: StatementFrame,
}

/// `financial_statements` 테이블 한 행.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialStatementRow {
    pub report_period: NaiveDate,
    pub report_type: ReportType,
    pub revenue: Option<i64>,
    pub gross_profit: Option<i64>,
    pub operating_income: Option<i64>,
    pub ebitda: Option<i64>,
    pub net_income: Option<i64>,
    pub total_assets: Option<i64>,
    pub total_liabilities: Option<i64>,
    pub total_equity: Option<i64>,
    pub operating_cash_flow: Option<i64>,
    pub investing_cash_flow: Option<i64>,
    pub financing_cash_flow: Option<i64>,
    pub free_cash_flow: Option<i64>,
}

impl StatementSet {
    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance.is_empty() && self.cashflow.is_empty()
    }

    fn frame_mut(&mut self, sheet: Sheet) -> &mut StatementFrame {
        match sheet {
            Sheet::Income => &mut self.income,
            Sheet::Balance => &mut self.balance,
            Sheet::CashFlow => &mut self.cashflow,
        }
    }

    /// 세 재무제표에 등장한 모든 기준일 (오름차순).
    pub fn periods(&self) -> Vec<NaiveDate> {
        let all: BTreeSet<NaiveDate> = self
            .income
            .periods()
            .chain(self.balance.periods())
            .chain(self.cashflow.periods())
            .collect();
        all.into_iter().collect()
    }

    /// 기준일별 행 생성.
    pub fn to_rows(&self, report_type: ReportType) -> Vec<FinancialStatementRow> {
        self.periods()
            .into_iter()
            .map(|period| FinancialStatementRow {
                report_period: period,
                report_type,
                revenue: self.income.value(REVENUE, period),
                gross_profit: self.income.value(GROSS_PROFIT, period),
                operating_income: self.income.value(OPERATING_INCOME, period),
                ebitda: self.income.value(EBITDA, period),
                net_income: self.income.value(NET_INCOME, period),
                total_assets: self.balance.value(TOTAL_ASSETS, period),
                total_liabilities: self.balance.value(TOTAL_LIABILITIES, period),
                total_equity: self.balance.value(TOTAL_EQUITY, period),
                operating_cash_flow: self.cashflow.value(OPERATING_CASH_FLOW, period),
                investing_cash_flow: self.cashflow.value(INVESTING_CASH_FLOW, period),
                financing_cash_flow: self.cashflow.value(FINANCING_CASH_FLOW, period),
                free_cash_flow: self.cashflow.value(FREE_CASH_FLOW, period),
            })
            .collect()
    }

    /// timeseries 응답 파싱.
    ///
    /// 각 결과의 `meta.type[0]`(예: `annualTotalRevenue`)에서 주기 접두어를 떼어 항목명으로 씁니다.
    pub fn from_timeseries(payload: &Value, report_type: ReportType) -> Self {
        let mut set = Self::default();
        let prefix = report_type.series_prefix();

        let results = payload
            .get("timeseries")
            .and_then(|t| t.get("result"))
            .and_then(Value::as_array);
        let Some(results) = results else {
            return set;
        };

        for item in results {
            let Some(series_type) = item
                .get("meta")
                .and_then(|m| m.get("type"))
                .and_then(Value::as_array)
                .and_then(|types| types.first())
                .and_then(Value::as_str)
            else {
                continue;
            };

            let label = series_type.strip_prefix(prefix).unwrap_or(series_type);
            let Some(sheet) = SERIES
                .iter()
                .find(|(name, _)| *name == label)
                .map(|(_, sheet)| *sheet)
            else {
                continue;
            };

            let Some(points) = item.get(series_type).and_then(Value::as_array) else {
                continue;
            };

            for point in points {
                let period = point
                    .get("asOfDate")
                    .and_then(Value::as_str)
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                let value = point
                    .get("reportedValue")
                    .and_then(|v| v.get("raw"))
                    .and_then(value_as_f64);

                if let (Some(period), Some(value)) = (period, value) {
                    set.frame_mut(sheet).insert(label, period, value);
                }
            }
        }

        set
    }
}

impl YahooClient {
    /// 연간/분기 재무제표 조회.
    pub async fn fetch_statements(
        &self,
        symbol: &str,
        report_type: ReportType,
    ) -> Result<StatementSet, YahooError> {
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.endpoints().query2,
            symbol
        );

        let prefix = report_type.series_prefix();
        let types = SERIES
            .iter()
            .map(|(name, _)| format!("{}{}", prefix, name))
            .collect::<Vec<_>>()
            .join(",");
        let period2 = Utc::now().timestamp();

        let payload = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("type", types),
                    ("period1", PERIOD_START_EPOCH.to_string()),
                    ("period2", period2.to_string()),
                ],
                false,
            )
            .await?;

        let set = StatementSet::from_timeseries(&payload, report_type);
        debug!(
            symbol,
            report_type = report_type.as_str(),
            periods = set.periods().len(),
            "재무제표 조회 완료"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Total Revenue"), "totalrevenue");
        assert_eq!(
            normalize_label("Net Cash Provided By (Used In) Financing Activities"),
            "netcashprovidedbyusedinfinancingactivities"
        );
    }

    #[test]
    fn test_exact_match_beats_earlier_substring() {
        let mut frame = StatementFrame::default();
        frame.insert("Operating Revenue", date("2023-12-31"), 1.0);
        frame.insert("TotalRevenue", date("2023-12-31"), 2.0);

        // "Revenue"가 부분 일치하지만 정확 일치 "TotalRevenue"가 먼저다
        assert_eq!(frame.find_row(REVENUE), Some("TotalRevenue"));
    }

    #[test]
    fn test_substring_match_either_direction() {
        let mut frame = StatementFrame::default();
        frame.insert("Gross Profit Reported", date("2023-12-31"), 5.0);
        assert_eq!(frame.find_row(GROSS_PROFIT), Some("Gross Profit Reported"));

        let mut frame = StatementFrame::default();
        frame.insert("Assets", date("2023-12-31"), 5.0);
        assert_eq!(frame.find_row(&["Total Assets"]), Some("Assets"));

        assert_eq!(frame.find_row(&["Liabilities"]), None);
    }

    #[test]
    fn test_from_timeseries_builds_rows() {
        let payload = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": { "symbol": ["AAPL"], "type": ["annualTotalRevenue"] },
                        "annualTotalRevenue": [
                            { "asOfDate": "2022-09-30", "reportedValue": { "raw": 394328000000i64 } },
                            null,
                            { "asOfDate": "2023-09-30", "reportedValue": { "raw": 383285000000i64 } }
                        ]
                    },
                    {
                        "meta": { "symbol": ["AAPL"], "type": ["annualTotalAssets"] },
                        "annualTotalAssets": [
                            { "asOfDate": "2023-09-30", "reportedValue": { "raw": 352583000000i64 } }
                        ]
                    },
                    {
                        "meta": { "symbol": ["AAPL"], "type": ["annualFreeCashFlow"] },
                        "annualFreeCashFlow": [
                            { "asOfDate": "2023-09-30", "reportedValue": { "raw": "(1,000)" } }
                        ]
                    },
                    {
                        "meta": { "symbol": ["AAPL"], "type": ["annualUnknownSeries"] },
                        "annualUnknownSeries": [
                            { "asOfDate": "2021-09-30", "reportedValue": { "raw": 1 } }
                        ]
                    }
                ]
            }
        });

        let set = StatementSet::from_timeseries(&payload, ReportType::Annual);
        assert_eq!(set.periods(), vec![date("2022-09-30"), date("2023-09-30")]);

        let rows = set.to_rows(ReportType::Annual);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].revenue, Some(394328000000));
        assert_eq!(rows[0].total_assets, None);

        assert_eq!(rows[1].report_type, ReportType::Annual);
        assert_eq!(rows[1].revenue, Some(383285000000));
        assert_eq!(rows[1].total_assets, Some(352583000000));
        assert_eq!(rows[1].free_cash_flow, Some(-1000));
        assert_eq!(rows[1].net_income, None);
    }

    #[test]
    fn test_empty_payload() {
        let set = StatementSet::from_timeseries(&json!({}), ReportType::Quarterly);
        assert!(set.is_empty());
        assert!(set.to_rows(ReportType::Quarterly).is_empty());
    }
}
