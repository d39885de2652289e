//! 종목 심볼 목록 소스 (CSV 파일, 배치 분할).

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::{DataError, Result};

/// S&P 500 구성 종목 CSV 기본 경로
pub const DEFAULT_SP500_CSV: &str = "data/sp500_tickers.csv";

/// CSV에서 종목 심볼 읽기.
///
/// 빈 줄과 `#` 주석 줄은 건너뛰고, 첫 번째 열을 대문자로 읽습니다.
/// `Symbol`/`Ticker` 헤더 줄은 무시하며 중복은 처음 것만 남깁니다.
pub fn parse_tickers<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let Some(first) = record.get(0) else {
            continue;
        };

        let symbol = first.trim().to_uppercase();
        if symbol.is_empty() || symbol == "SYMBOL" || symbol == "TICKER" {
            continue;
        }

        if seen.insert(symbol.clone()) {
            tickers.push(symbol);
        }
    }

    Ok(tickers)
}

/// CSV 파일 경로에서 종목 심볼 읽기.
pub fn read_tickers_csv(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        DataError::InvalidData(format!("티커 CSV 열기 실패 ({}): {}", path.display(), e))
    })?;
    parse_tickers(file)
}

/// Yahoo 심볼 표기로 변환 (`BRK.B` → `BRK-B`).
pub fn to_yahoo_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

/// 배치 크기 검증. 0 이하이면 설정 오류.
pub fn chunk_size(size: i64) -> Result<usize> {
    if size <= 0 {
        return Err(DataError::InvalidData(
            "Chunk size must be greater than zero".to_string(),
        ));
    }
    usize::try_from(size)
        .map_err(|_| DataError::InvalidData(format!("Chunk size too large: {}", size)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tickers_skips_comments_and_duplicates() {
        let input = "Symbol,Security\n# comment line\n\naapl, Apple\nMSFT,Microsoft\n AAPL ,dup\nBRK.B\n";
        let tickers = parse_tickers(input.as_bytes()).unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn test_to_yahoo_symbol() {
        assert_eq!(to_yahoo_symbol("brk.b"), "BRK-B");
        assert_eq!(to_yahoo_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(chunk_size(50).unwrap(), 50);
        assert!(matches!(chunk_size(0), Err(DataError::InvalidData(_))));
        assert!(chunk_size(-1).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_tickers_csv("/nonexistent/tickers.csv").unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }
}
