//! Standalone data collector CLI.

use std::path::PathBuf;

use alphabot_collector::modules::{self, IngestOptions, NewsCrawlOptions, TickerSource};
use alphabot_collector::{CollectionStats, CollectorConfig, CollectorError};
use alphabot_core::{init_logging, load_dotenv, LogConfig};
use alphabot_data::Database;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "alphabot-collector")]
#[command(about = "AlphaBot Standalone Data Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 종목 스냅샷과 재무제표 수집 (Yahoo Finance)
    Ingest {
        /// 수집할 종목 (예: AAPL MSFT), 없으면 AAPL
        tickers: Vec<String>,

        /// S&P 500 종목 CSV 사용
        #[arg(long, conflicts_with = "us_all")]
        sp500: bool,

        /// 미국 전체 종목 (스냅샷만)
        #[arg(long, conflicts_with = "csv_path")]
        us_all: bool,

        /// 종목 CSV 경로 (`--sp500`과 함께 쓰면 S&P 500 CSV 경로를 대체)
        #[arg(long)]
        csv_path: Option<PathBuf>,

        /// 최대 종목 수
        #[arg(long)]
        limit: Option<usize>,

        /// 배치당 종목 수 (기본: INGEST_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<i64>,

        /// 스크리너 페이지 크기 (기본: INGEST_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<u32>,

        /// 재무제표 수집 생략
        #[arg(long)]
        skip_statements: bool,
    },

    /// 네이버 금융 뉴스 크롤링 (CSV 저장)
    CrawlNews {
        /// 시작일 (YYYYMMDD 또는 YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// 종료일 (YYYYMMDD 또는 YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// 카테고리 (쉼표로 구분, 예: "401,402"), 없으면 전체
        #[arg(long)]
        categories: Option<String>,

        /// 출력 디렉터리 (기본: NEWS_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// 데몬 모드: 주기적으로 뉴스 크롤링과 S&P 500 수집 실행
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    load_dotenv();

    init_logging(LogConfig::from_env(format!(
        "alphabot_collector={},alphabot_data={}",
        cli.log_level, cli.log_level
    )))?;

    tracing::info!("AlphaBot Data Collector 시작");

    let config = CollectorConfig::from_env();

    match cli.command {
        Commands::Ingest {
            tickers,
            sp500,
            us_all,
            csv_path,
            limit,
            batch_size,
            page_size,
            skip_statements,
        } => {
            let source = if us_all {
                TickerSource::UsAll {
                    page_size: page_size.unwrap_or(config.ingest.page_size),
                }
            } else if sp500 {
                TickerSource::Sp500(csv_path.unwrap_or_else(|| config.ingest.sp500_csv.clone()))
            } else if let Some(path) = csv_path {
                TickerSource::Csv(path)
            } else {
                TickerSource::Explicit(tickers)
            };

            let options = IngestOptions {
                source,
                limit,
                batch_size: batch_size.unwrap_or(config.ingest.batch_size),
                skip_statements,
            };

            let pool = connect(&config).await?;
            let result = modules::ingest_stocks(&pool, &options).await;
            pool.close().await;

            result?.log_summary("종목 수집");
        }
        Commands::CrawlNews {
            start,
            end,
            categories,
            output_dir,
        } => {
            let options = NewsCrawlOptions {
                start,
                end,
                categories: categories.or_else(|| config.news.categories.clone()),
                output_dir: output_dir.unwrap_or_else(|| config.news.output_dir.clone()),
            };

            let report = modules::crawl_news(&options).await?;
            report.stats.log_summary("뉴스 크롤링");
            if let Some(path) = report.path {
                tracing::info!(path = %path.display(), "뉴스 CSV 생성");
            }
        }
        Commands::Daemon => {
            let pool = connect(&config).await?;
            run_daemon(&pool, &config).await;
            pool.close().await;
        }
    }

    tracing::info!("AlphaBot Data Collector 종료");

    Ok(())
}

/// DB 연결 (ingest, daemon)
async fn connect(config: &CollectorConfig) -> Result<PgPool, CollectorError> {
    let db = Database::connect(config.database()?).await?;
    tracing::info!("데이터베이스 연결 성공");
    Ok(db.into_pool())
}

/// 주기 실행 루프. Ctrl+C로 종료합니다.
async fn run_daemon(pool: &PgPool, config: &CollectorConfig) {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.daemon.interval_minutes
    );

    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                tracing::info!("=== 워크플로우 실행 시작 ===");
                let mut cycle = CollectionStats::new();

                // 1. 어제~오늘 뉴스
                let today = chrono::Local::now().date_naive();
                let news_options = NewsCrawlOptions::yesterday_and_today(
                    today,
                    config.news.categories.clone(),
                    config.news.output_dir.clone(),
                );
                match modules::crawl_news(&news_options).await {
                    Ok(report) => {
                        report.stats.log_summary("뉴스 크롤링");
                        cycle.merge(&report.stats);
                    }
                    Err(e) => {
                        tracing::error!("뉴스 크롤링 실패: {}", e);
                    }
                }

                // 2. S&P 500 종목
                match modules::ingest_stocks(pool, &IngestOptions::sp500(config)).await {
                    Ok(stats) => {
                        stats.log_summary("종목 수집");
                        cycle.merge(&stats);
                    }
                    Err(e) => {
                        tracing::error!("종목 수집 실패: {}", e);
                    }
                }

                cycle.log_summary("워크플로우");
                tracing::info!(
                    "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }
}
