//! 종목 토론 댓글 endpoint.
//!
//! 목록은 공개, 작성/수정/삭제는 로그인 사용자 본인만 가능합니다.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{page_params, parse_stock_code};
use crate::auth::CurrentUser;
use crate::error::{db_error, not_found, validate_request, ApiErrorResponse, ApiResult};
use crate::repository::{CommentRecord, CommentRepository};
use crate::state::AppState;

const COMMENT_NOT_FOUND: &str = "Comment not found or permission denied";

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// 댓글 작성 요청
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    pub stock_code: String,
    #[validate(
        custom(function = not_blank, message = "content must not be blank"),
        length(max = 1000, message = "content must be at most 1000 characters")
    )]
    pub content: String,
}

/// 댓글 수정 요청
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCommentRequest {
    #[validate(
        custom(function = not_blank, message = "content must not be blank"),
        length(max = 1000, message = "content must be at most 1000 characters")
    )]
    pub content: String,
}

/// 목록 쿼리
#[derive(Debug, Deserialize, IntoParams)]
pub struct CommentListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// 없으면 전체 종목
    pub stock_code: Option<String>,
}

/// 댓글 목록 응답
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<CommentRecord>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// 댓글 작성
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "작성됨", body = CommentRecord),
        (status = 400, description = "잘못된 종목 코드", body = ApiErrorResponse),
        (status = 422, description = "입력값 오류", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentRecord>)> {
    validate_request(&request)?;
    let code = parse_stock_code(&request.stock_code)?;
    let pool = state.pool()?;

    let comment = CommentRepository::create(pool, user.user_id, code.as_str(), &request.content)
        .await
        .map_err(db_error)?;

    info!(
        user_id = user.user_id,
        comment_id = comment.comment_id,
        stock_code = %code,
        "Comment created"
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

/// 댓글 목록 (최신순, 공개)
#[utoipa::path(
    get,
    path = "/api/comments",
    params(CommentListQuery),
    responses(
        (status = 200, description = "댓글 목록", body = CommentListResponse),
        (status = 400, description = "잘못된 페이지/종목 코드", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Json<CommentListResponse>> {
    let pagination = page_params(query.page, query.page_size)?;
    let code = query
        .stock_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(parse_stock_code)
        .transpose()?;
    let code = code.as_ref().map(|c| c.as_str());
    let pool = state.pool()?;

    let total = CommentRepository::count(pool, code)
        .await
        .map_err(db_error)?;
    let comments = CommentRepository::list(pool, code, pagination.limit(), pagination.offset())
        .await
        .map_err(db_error)?;

    Ok(Json(CommentListResponse {
        comments,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages(total),
    }))
}

/// 본인 댓글 수정
#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    params(("id" = i32, Path, description = "댓글 ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "수정됨", body = CommentRecord),
        (status = 404, description = "없음", body = ApiErrorResponse),
        (status = 422, description = "입력값 오류", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i32>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentRecord>> {
    validate_request(&request)?;
    let pool = state.pool()?;

    CommentRepository::update(pool, user.user_id, comment_id, &request.content)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found(COMMENT_NOT_FOUND))
}

/// 본인 댓글 삭제
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = i32, Path, description = "댓글 ID")),
    responses(
        (status = 204, description = "삭제됨"),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let pool = state.pool()?;

    if !CommentRepository::delete(pool, user.user_id, comment_id)
        .await
        .map_err(db_error)?
    {
        return Err(not_found(COMMENT_NOT_FOUND));
    }

    info!(user_id = user.user_id, comment_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn comments_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
}
