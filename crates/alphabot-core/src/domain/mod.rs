//! 도메인 값 타입.

mod chat;
mod pagination;
mod statement;
mod stock_code;

pub use chat::{MessageRole, TrashState};
pub use pagination::{Pagination, PaginationError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use statement::ReportType;
pub use stock_code::{StockCode, StockCodeError, MAX_STOCK_CODE_LEN};
