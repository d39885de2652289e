//! 요청 간 무작위 대기.
//!
//! 외부 사이트 부하를 줄이기 위해 고정 딜레이 대신 구간 내 균등분포 딜레이를 사용합니다.

use rand::Rng;
use std::time::Duration;

/// 대기 구간 (초 단위, 양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Jitter {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// 대기 없음 (테스트용)
    pub const fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 구간 내 무작위 Duration
    pub fn sample(&self) -> Duration {
        let (lo, hi) = if self.min_secs <= self.max_secs {
            (self.min_secs, self.max_secs)
        } else {
            (self.max_secs, self.min_secs)
        };
        if hi <= 0.0 {
            return Duration::ZERO;
        }
        let secs = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub async fn sleep(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let jitter = Jitter::new(0.5, 1.2);
        for _ in 0..100 {
            let d = jitter.sample().as_secs_f64();
            assert!((0.5..=1.2).contains(&d), "out of range: {}", d);
        }
    }

    #[test]
    fn test_reversed_and_zero() {
        let d = Jitter::new(2.0, 1.0).sample().as_secs_f64();
        assert!((1.0..=2.0).contains(&d));
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
    }
}
