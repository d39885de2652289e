//! 미국 종목 스냅샷/재무제표 수집 모듈.
//!
//! 종목 목록을 배치로 나눠 Yahoo Finance에서 조회하고 종목 단위 트랜잭션으로 저장합니다.
//! 한 종목의 실패는 로그와 통계에만 남기고 다음 종목으로 넘어갑니다.

use alphabot_core::{ReportType, StockCode};
use alphabot_data::yahoo::screener::PAGE_JITTER;
use alphabot_data::yahoo::{
    fetch_us_universe, CompanySnapshot, FinancialStatementRow, PriceHistoryFetcher,
};
use alphabot_data::{chunk_size, read_tickers_csv, to_yahoo_symbol, Jitter, StockStore, YahooClient};
use sqlx::PgPool;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use crate::{CollectionStats, CollectorConfig, Result};

/// 종목을 지정하지 않았을 때 수집할 기본 종목
pub const DEFAULT_TICKER: &str = "AAPL";

/// 수집 대상 종목 출처
#[derive(Debug, Clone, PartialEq)]
pub enum TickerSource {
    /// 명령행에서 직접 지정 (비어 있으면 [`DEFAULT_TICKER`])
    Explicit(Vec<String>),
    /// 종목 CSV 파일
    Csv(PathBuf),
    /// S&P 500 종목 CSV 파일
    Sp500(PathBuf),
    /// Yahoo 스크리너 기반 미국 전체 종목
    UsAll { page_size: u32 },
}

impl TickerSource {
    /// 재무제표 수집 대상인지 (미국 전체는 스냅샷만)
    pub fn includes_statements(&self) -> bool {
        !matches!(self, Self::UsAll { .. })
    }
}

/// 수집 옵션
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub source: TickerSource,
    /// 최대 종목 수
    pub limit: Option<usize>,
    /// 배치당 종목 수 (0 이하이면 설정 오류)
    pub batch_size: i64,
    /// 재무제표 생략
    pub skip_statements: bool,
}

impl IngestOptions {
    /// 설정 기본값으로 S&P 500 전체 수집 (데몬 모드)
    pub fn sp500(config: &CollectorConfig) -> Self {
        Self {
            source: TickerSource::Sp500(config.ingest.sp500_csv.clone()),
            limit: None,
            batch_size: config.ingest.batch_size,
            skip_statements: false,
        }
    }

    fn with_statements(&self) -> bool {
        !self.skip_statements && self.source.includes_statements()
    }
}

/// 요청 간 대기 구간
#[derive(Debug, Clone, Copy)]
pub struct IngestDelays {
    /// 종목 사이
    pub per_ticker: Jitter,
    /// 재무제표 요청 사이
    pub per_statement: Jitter,
    /// 스크리너 페이지 사이
    pub per_page: Jitter,
}

impl Default for IngestDelays {
    fn default() -> Self {
        Self {
            per_ticker: Jitter::new(0.5, 1.2),
            per_statement: Jitter::new(0.2, 0.6),
            per_page: PAGE_JITTER,
        }
    }
}

impl IngestDelays {
    /// 대기 없음 (테스트용)
    pub fn none() -> Self {
        Self {
            per_ticker: Jitter::none(),
            per_statement: Jitter::none(),
            per_page: Jitter::none(),
        }
    }
}

/// 저장 직전의 종목 데이터
#[derive(Debug, Clone)]
pub struct TickerData {
    pub snapshot: CompanySnapshot,
    pub statements: Vec<FinancialStatementRow>,
}

/// 종목 하나의 조회 결과
#[derive(Debug)]
pub enum TickerFetch {
    Ready(TickerData),
    /// 조회는 성공했지만 정보가 비어 있음
    Empty,
}

/// Yahoo 조회기 묶음.
pub struct StockIngester {
    client: YahooClient,
    history: Option<PriceHistoryFetcher>,
    delays: IngestDelays,
}

impl StockIngester {
    /// 기본 엔드포인트로 생성. 일봉 조회기 생성에 실패하면 보충 없이 진행합니다.
    pub fn new() -> Result<Self> {
        let client = YahooClient::new()?;
        let history = match PriceHistoryFetcher::new() {
            Ok(fetcher) => Some(fetcher),
            Err(e) => {
                tracing::warn!(error = %e, "일봉 조회기 생성 실패, 시세 보충 없이 진행");
                None
            }
        };
        Ok(Self::with_parts(client, history, IngestDelays::default()))
    }

    pub fn with_parts(
        client: YahooClient,
        history: Option<PriceHistoryFetcher>,
        delays: IngestDelays,
    ) -> Self {
        Self {
            client,
            history,
            delays,
        }
    }

    pub fn delays(&self) -> IngestDelays {
        self.delays
    }

    /// 수집 대상 종목 목록 결정 (대문자, 중복 제거, `limit` 적용).
    pub async fn resolve_tickers(
        &self,
        source: &TickerSource,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let raw = match source {
            TickerSource::Explicit(tickers) if tickers.is_empty() => {
                vec![DEFAULT_TICKER.to_string()]
            }
            TickerSource::Explicit(tickers) => tickers.clone(),
            TickerSource::Csv(path) => read_tickers_csv(path)?,
            // S&P 500 목록은 `BRK.B` 표기라 Yahoo 표기로 바꾼다
            TickerSource::Sp500(path) => read_tickers_csv(path)?
                .iter()
                .map(|t| to_yahoo_symbol(t))
                .collect(),
            TickerSource::UsAll { page_size } => {
                fetch_us_universe(&self.client, *page_size, limit, self.delays.per_page).await?
            }
        };

        let mut seen = HashSet::new();
        let mut tickers: Vec<String> = raw
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        if let Some(limit) = limit {
            tickers.truncate(limit);
        }
        Ok(tickers)
    }

    /// 종목 하나 조회.
    ///
    /// 정보 조회 실패는 에러로, 재무제표 조회 실패는 경고 후 빈 재무제표로 처리합니다.
    pub async fn fetch_ticker(&self, symbol: &str, with_statements: bool) -> Result<TickerFetch> {
        let info = self.client.fetch_info(symbol).await?;
        if info.is_empty() {
            return Ok(TickerFetch::Empty);
        }

        let mut snapshot = CompanySnapshot::from_info(symbol, &info);

        if snapshot.needs_price_backfill() {
            if let Some(history) = &self.history {
                match history.fetch_year(symbol).await {
                    Ok(bars) => snapshot.backfill_from_history(&bars),
                    Err(e) => tracing::warn!(symbol, error = %e, "일봉 보충 실패"),
                }
            }
        }

        let mut statements = Vec::new();
        if with_statements {
            for report_type in ReportType::ALL {
                self.delays.per_statement.sleep().await;
                match self.client.fetch_statements(symbol, report_type).await {
                    Ok(set) if set.is_empty() => {
                        tracing::debug!(symbol, %report_type, "재무제표 없음");
                    }
                    Ok(set) => statements.extend(set.to_rows(report_type)),
                    Err(e) => {
                        tracing::warn!(symbol, %report_type, error = %e, "재무제표 조회 실패");
                    }
                }
            }
        }

        Ok(TickerFetch::Ready(TickerData {
            snapshot,
            statements,
        }))
    }
}

/// 종목 스냅샷/재무제표 수집
pub async fn ingest_stocks(pool: &PgPool, options: &IngestOptions) -> Result<CollectionStats> {
    let ingester = StockIngester::new()?;
    ingest_with(&ingester, &StockStore::new(pool.clone()), options).await
}

/// 주어진 조회기/저장소로 수집 실행
pub async fn ingest_with(
    ingester: &StockIngester,
    store: &StockStore,
    options: &IngestOptions,
) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    // 종목 목록 조회 전에 배치 크기부터 검증
    let batch_size = chunk_size(options.batch_size)?;
    let tickers = ingester
        .resolve_tickers(&options.source, options.limit)
        .await?;
    let batches = tickers.chunks(batch_size);

    if tickers.is_empty() {
        tracing::warn!("수집할 종목이 없습니다");
        stats.elapsed = start.elapsed();
        return Ok(stats);
    }

    let with_statements = options.with_statements();
    tracing::info!(
        tickers = tickers.len(),
        batch_size = options.batch_size,
        with_statements,
        "종목 수집 시작"
    );

    let batch_count = batches.len();
    for (batch_idx, batch) in batches.enumerate() {
        tracing::info!(
            batch = format!("{}/{}", batch_idx + 1, batch_count),
            size = batch.len(),
            "배치 처리"
        );

        for symbol in batch {
            stats.total += 1;

            if let Err(e) = StockCode::normalize(symbol) {
                tracing::warn!(symbol = %symbol, error = %e, "잘못된 종목 코드, 건너뜀");
                stats.skipped += 1;
                continue;
            }

            match ingester.fetch_ticker(symbol, with_statements).await {
                Ok(TickerFetch::Ready(data)) => {
                    match store.save_ticker(&data.snapshot, &data.statements).await {
                        Ok(saved) => {
                            stats.success += 1;
                            stats.saved_rows += saved;
                            tracing::debug!(symbol = %symbol, statements = saved, "종목 저장 완료");
                        }
                        Err(e) => {
                            stats.errors += 1;
                            tracing::error!(symbol = %symbol, error = %e, "종목 저장 실패");
                        }
                    }
                }
                Ok(TickerFetch::Empty) => {
                    stats.empty += 1;
                    tracing::warn!(symbol = %symbol, "종목 정보 없음");
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(symbol = %symbol, error = %e, "종목 조회 실패");
                }
            }

            ingester.delays().per_ticker.sleep().await;
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
