//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health`, `/health/ready` - 헬스 체크
//! - `/api/signup`, `/api/login`, `/api/users/me` - 인증
//! - `/api/rooms` - 채팅방과 메시지, 어시스턴트 응답
//! - `/api/v1/chats/by-stock/{code}` - 종목 채팅방 upsert
//! - `/api/categories` - 북마크 카테고리
//! - `/api/bookmarks` - 메시지 북마크
//! - `/api/comments` - 종목 토론 댓글

pub mod auth;
pub mod bookmarks;
pub mod categories;
pub mod chats;
pub mod comments;
pub mod health;

pub use auth::{auth_router, LoginRequest, SignupRequest, TokenResponse, UserResponse};
pub use bookmarks::{bookmarks_router, BookmarkListResponse};
pub use categories::{categories_router, CategoryListResponse};
pub use chats::{chats_router, ChatReplyResponse, UpsertChatResponse};
pub use comments::{comments_router, CommentListResponse};
pub use health::{health_router, HealthResponse, ReadinessResponse};

use alphabot_core::{Pagination, StockCode};
use axum::Router;
use std::sync::Arc;

use crate::error::{bad_request, ApiResult};
use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    let api = Router::new()
        .merge(auth_router())
        .merge(chats_router())
        .merge(categories_router())
        .merge(bookmarks_router())
        .merge(comments_router());

    Router::new().merge(health_router()).nest("/api", api)
}

/// 경로/쿼리의 종목 코드 정규화. 실패하면 400.
pub(crate) fn parse_stock_code(raw: &str) -> ApiResult<StockCode> {
    StockCode::normalize(raw).map_err(|e| bad_request(e.to_string()))
}

/// `page`/`page_size` 쿼리 검증. 실패하면 400.
pub(crate) fn page_params(page: Option<i64>, page_size: Option<i64>) -> ApiResult<Pagination> {
    let defaults = Pagination::default();
    Pagination::new(
        page.unwrap_or(defaults.page),
        page_size.unwrap_or(defaults.page_size),
    )
    .map_err(|e| bad_request(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};

    use crate::auth::issue_access_token;
    use crate::state::create_test_state;

    /// DB 없는 상태로 전체 라우터 구성
    pub fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(create_test_state());
        (create_api_router().with_state(state.clone()), state)
    }

    /// DB가 연결된 전체 라우터
    pub fn db_app(pool: sqlx::PgPool) -> (Router, Arc<AppState>) {
        let state = Arc::new(create_test_state().with_db_pool(pool));
        (create_api_router().with_state(state.clone()), state)
    }

    pub fn bearer(state: &AppState) -> String {
        bearer_for(state, "tester01")
    }

    pub fn bearer_for(state: &AppState, login_id: &str) -> String {
        let token = issue_access_token(login_id, &state.auth.secret, 30).unwrap();
        format!("Bearer {}", token)
    }

    pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
