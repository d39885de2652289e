//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 건너뛴 횟수 (잘못된 심볼 등)
    pub skipped: usize,
    /// 빈 데이터 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 저장된 행 수 (재무제표 행 또는 뉴스 기사)
    pub saved_rows: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 다른 작업 통계 합산 (데몬 한 주기 요약용)
    pub fn merge(&mut self, other: &CollectionStats) {
        self.total += other.total;
        self.success += other.success;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.empty += other.empty;
        self.saved_rows += other.saved_rows;
        self.elapsed += other.elapsed;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            empty = self.empty,
            saved_rows = self.saved_rows,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = CollectionStats::new();
        assert_eq!(stats.success_rate(), 0.0);

        let stats = CollectionStats {
            total: 8,
            success: 6,
            errors: 1,
            empty: 1,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_accumulates() {
        let mut total = CollectionStats {
            total: 2,
            success: 2,
            saved_rows: 10,
            elapsed: Duration::from_secs(3),
            ..Default::default()
        };
        total.merge(&CollectionStats {
            total: 3,
            success: 1,
            errors: 1,
            skipped: 1,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        });

        assert_eq!(total.total, 5);
        assert_eq!(total.success, 3);
        assert_eq!(total.errors, 1);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.saved_rows, 10);
        assert_eq!(total.elapsed, Duration::from_secs(5));
    }
}
