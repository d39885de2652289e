//! 목록 API 페이지네이션.

use serde::Deserialize;
use thiserror::Error;

/// 기본 페이지 크기
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// 최대 페이지 크기
pub const MAX_PAGE_SIZE: i64 = 100;
/// 최대 페이지 번호 (OFFSET 계산이 i64를 넘지 않는 범위)
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// 페이지네이션 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page must be greater than or equal to 1")]
    InvalidPage,
    #[error("page is too large")]
    PageTooLarge,
    #[error("page_size must be between 1 and 100")]
    InvalidPageSize,
}

/// 페이지 번호(1부터)와 페이지 크기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Result<Self, PaginationError> {
        let pagination = Self { page, page_size };
        pagination.validate()?;
        Ok(pagination)
    }

    /// `1 <= page <= MAX_PAGE`, `1 <= page_size <= 100` 확인
    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.page < 1 {
            return Err(PaginationError::InvalidPage);
        }
        if self.page > MAX_PAGE {
            return Err(PaginationError::PageTooLarge);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(PaginationError::InvalidPageSize);
        }
        Ok(())
    }

    /// SQL OFFSET
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// SQL LIMIT
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// 전체 페이지 수. 결과가 없어도 1페이지로 취급합니다.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + self.page_size - 1) / self.page_size
        }
    }
}
