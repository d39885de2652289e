//! 재무제표 보고 유형.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 재무제표 보고 주기.
///
/// DB에는 `"Annual"` / `"Quarterly"` 문자열로 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    Annual,
    Quarterly,
}

impl ReportType {
    pub const ALL: [ReportType; 2] = [ReportType::Annual, ReportType::Quarterly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "Annual",
            Self::Quarterly => "Quarterly",
        }
    }

    /// Yahoo fundamentals-timeseries 타입 접두사 (`annualTotalRevenue` 등)
    pub fn series_prefix(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
