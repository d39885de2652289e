//! 환경변수 기반 설정 모듈.

use alphabot_core::{env_var_opt, env_var_parse, load_dotenv};
use alphabot_data::yahoo::DEFAULT_SCREENER_PAGE_SIZE;
use alphabot_data::{DatabaseConfig, DEFAULT_SP500_CSV};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 접속 설정 (뉴스 크롤링만 할 때는 없어도 됨)
    pub database: Option<DatabaseConfig>,
    /// 종목 수집 설정
    pub ingest: IngestConfig,
    /// 뉴스 크롤링 설정
    pub news: NewsConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 종목 수집 설정
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// 배치당 종목 수
    pub batch_size: i64,
    /// 스크리너 페이지 크기 (`--us-all`)
    pub page_size: u32,
    /// S&P 500 종목 CSV 경로
    pub sp500_csv: PathBuf,
}

/// 뉴스 크롤링 설정
#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// CSV 출력 디렉터리
    pub output_dir: PathBuf,
    /// 카테고리 목록 (`401,402`), 없으면 전체
    pub categories: Option<String>,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        load_dotenv();

        let database = match DatabaseConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!(error = %e, "데이터베이스 설정 없음");
                None
            }
        };

        Self {
            database,
            ingest: IngestConfig::from_env(),
            news: NewsConfig::from_env(),
            daemon: DaemonConfig::from_env(),
        }
    }

    /// DB가 필요한 명령에서 사용
    pub fn database(&self) -> Result<&DatabaseConfig> {
        self.database.as_ref().ok_or_else(|| {
            CollectorError::Config(
                "DATABASE_URL 또는 DB_USER/DB_PASSWORD/DB_HOST/DB_NAME 환경변수가 설정되지 않았습니다"
                    .to_string(),
            )
        })
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env_var_parse("INGEST_BATCH_SIZE", 50),
            page_size: env_var_parse("INGEST_PAGE_SIZE", DEFAULT_SCREENER_PAGE_SIZE),
            sp500_csv: env_var_opt("SP500_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SP500_CSV)),
        }
    }
}

impl NewsConfig {
    pub fn from_env() -> Self {
        Self {
            output_dir: env_var_opt("NEWS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            categories: env_var_opt("NEWS_CATEGORIES"),
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self {
            interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 1440),
        }
    }

    /// 워크플로우 실행 주기를 Duration으로 반환 (최소 1분)
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}
