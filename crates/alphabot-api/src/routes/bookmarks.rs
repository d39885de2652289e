//! 메시지 북마크 endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::page_params;
use crate::auth::CurrentUser;
use crate::error::{db_error, not_found, ApiErrorResponse, ApiResult};
use crate::repository::{
    BookmarkRecord, BookmarkRepository, CategoryRepository, MessageRepository,
};
use crate::state::AppState;

const BOOKMARK_NOT_FOUND: &str = "Bookmark not found or permission denied";
const MESSAGE_NOT_FOUND: &str = "Message not found or permission denied";
const CATEGORY_NOT_FOUND: &str = "Category not found";

/// 북마크 생성 요청
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookmarkRequest {
    pub messages_id: i32,
    pub category_id: Option<i32>,
}

/// 카테고리 이동 요청 (`null`이면 미분류)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookmarkRequest {
    pub category_id: Option<i32>,
}

/// 목록 쿼리
#[derive(Debug, Deserialize, IntoParams)]
pub struct BookmarkListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// 없으면 전체
    pub category_id: Option<i32>,
}

/// 북마크 목록 응답
#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkListResponse {
    pub bookmarks: Vec<BookmarkRecord>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// 카테고리가 지정됐으면 본인 소유인지 확인
async fn ensure_category(pool: &PgPool, user_id: i32, category_id: Option<i32>) -> ApiResult<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    CategoryRepository::find_owned(pool, user_id, category_id)
        .await
        .map_err(db_error)?
        .map(|_| ())
        .ok_or_else(|| not_found(CATEGORY_NOT_FOUND))
}

/// 북마크 생성
#[utoipa::path(
    post,
    path = "/api/bookmarks",
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "생성됨", body = BookmarkRecord),
        (status = 404, description = "메시지/카테고리 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookmarks"
)]
pub async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateBookmarkRequest>,
) -> ApiResult<(StatusCode, Json<BookmarkRecord>)> {
    let pool = state.pool()?;

    if !MessageRepository::is_owned_by(pool, user.user_id, request.messages_id)
        .await
        .map_err(db_error)?
    {
        return Err(not_found(MESSAGE_NOT_FOUND));
    }
    ensure_category(pool, user.user_id, request.category_id).await?;

    let bookmark =
        BookmarkRepository::create(pool, user.user_id, request.messages_id, request.category_id)
            .await
            .map_err(db_error)?;

    info!(
        user_id = user.user_id,
        bookmark_id = bookmark.bookmark_id,
        "Bookmark created"
    );
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// 북마크 목록 (최신순)
#[utoipa::path(
    get,
    path = "/api/bookmarks",
    params(BookmarkListQuery),
    responses(
        (status = 200, description = "북마크 목록", body = BookmarkListResponse),
        (status = 400, description = "잘못된 페이지", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookmarks"
)]
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BookmarkListQuery>,
) -> ApiResult<Json<BookmarkListResponse>> {
    let pagination = page_params(query.page, query.page_size)?;
    let pool = state.pool()?;

    let total = BookmarkRepository::count(pool, user.user_id, query.category_id)
        .await
        .map_err(db_error)?;
    let bookmarks = BookmarkRepository::list(
        pool,
        user.user_id,
        query.category_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await
    .map_err(db_error)?;

    Ok(Json(BookmarkListResponse {
        bookmarks,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages(total),
    }))
}

/// 카테고리 이동
#[utoipa::path(
    put,
    path = "/api/bookmarks/{id}",
    params(("id" = i32, Path, description = "북마크 ID")),
    request_body = UpdateBookmarkRequest,
    responses(
        (status = 200, description = "수정됨", body = BookmarkRecord),
        (status = 404, description = "북마크/카테고리 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookmarks"
)]
pub async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(bookmark_id): Path<i32>,
    Json(request): Json<UpdateBookmarkRequest>,
) -> ApiResult<Json<BookmarkRecord>> {
    let pool = state.pool()?;

    // 북마크 소유 확인이 카테고리 확인보다 먼저
    BookmarkRepository::find_owned(pool, user.user_id, bookmark_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(BOOKMARK_NOT_FOUND))?;
    ensure_category(pool, user.user_id, request.category_id).await?;

    BookmarkRepository::update_category(pool, user.user_id, bookmark_id, request.category_id)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found(BOOKMARK_NOT_FOUND))
}

/// 북마크 삭제
#[utoipa::path(
    delete,
    path = "/api/bookmarks/{id}",
    params(("id" = i32, Path, description = "북마크 ID")),
    responses(
        (status = 204, description = "삭제됨"),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookmarks"
)]
pub async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(bookmark_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let pool = state.pool()?;

    if !BookmarkRepository::delete(pool, user.user_id, bookmark_id)
        .await
        .map_err(db_error)?
    {
        return Err(not_found(BOOKMARK_NOT_FOUND));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub fn bookmarks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/bookmarks/{id}", put(update_bookmark).delete(delete_bookmark))
}
