//! 북마크 카테고리 endpoint.
//!
//! 모든 카테고리는 사용자 소유이며, 같은 사용자 안에서 제목이 유일합니다.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::page_params;
use crate::auth::CurrentUser;
use crate::error::{
    api_error, bad_request, db_error, is_unique_violation, not_found, validate_request,
    ApiErrorResponse, ApiResult,
};
use crate::repository::{CategoryFilter, CategoryRecord, CategoryRepository, CategorySort};
use crate::state::AppState;

const CATEGORY_NOT_FOUND: &str = "Category not found";
const DUPLICATE_TITLE: &str = "Category with this title already exists";

const TITLE_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 200;

// ================================================================================================
// Request/Response Types
// ================================================================================================

/// 카테고리 생성 요청
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "title must be 1-50 characters"))]
    pub title: String,
    #[validate(length(max = 200, message = "description must be at most 200 characters"))]
    pub description: Option<String>,
}

/// 카테고리 부분 수정 요청.
///
/// `description`은 필드가 없으면 유지, `null`이면 삭제합니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl UpdateCategoryRequest {
    fn validate(&self) -> ApiResult<()> {
        if let Some(title) = &self.title {
            let len = title.chars().count();
            if len == 0 || len > TITLE_MAX {
                return Err(unprocessable("title must be 1-50 characters"));
            }
        }
        if let Some(Some(description)) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX {
                return Err(unprocessable("description must be at most 200 characters"));
            }
        }
        Ok(())
    }
}

/// 존재하는 `null`을 `Some(None)`으로 구분
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn unprocessable(message: &str) -> crate::error::ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
}

/// 목록 쿼리
#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// 제목 부분 일치 (대소문자 무시)
    pub search: Option<String>,
    /// "title"이면 제목순, 그 외 최신순
    pub sort_by: Option<String>,
}

/// 카테고리 목록 응답
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryRecord>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 카테고리 생성
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "생성됨", body = CategoryRecord),
        (status = 400, description = "제목 중복", body = ApiErrorResponse),
        (status = 422, description = "입력값 오류", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<CategoryRecord>)> {
    validate_request(&request)?;
    let pool = state.pool()?;

    if CategoryRepository::title_exists(pool, user.user_id, &request.title, None)
        .await
        .map_err(db_error)?
    {
        return Err(bad_request(DUPLICATE_TITLE));
    }

    let category = CategoryRepository::create(
        pool,
        user.user_id,
        &request.title,
        request.description.as_deref(),
    )
    .await
    .map_err(duplicate_or_db_error)?;

    info!(
        user_id = user.user_id,
        category_id = category.category_id,
        "Category created"
    );
    Ok((StatusCode::CREATED, Json(category)))
}

/// 카테고리 목록 (검색, 정렬, 페이지)
#[utoipa::path(
    get,
    path = "/api/categories",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "카테고리 목록", body = CategoryListResponse),
        (status = 400, description = "잘못된 페이지", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Json<CategoryListResponse>> {
    let pagination = page_params(query.page, query.page_size)?;
    let filter = CategoryFilter {
        search: query.search,
        sort: CategorySort::from_param(query.sort_by.as_deref()),
    };
    let pool = state.pool()?;

    let total = CategoryRepository::count(pool, user.user_id, &filter)
        .await
        .map_err(db_error)?;
    let categories = CategoryRepository::list(
        pool,
        user.user_id,
        &filter,
        pagination.limit(),
        pagination.offset(),
    )
    .await
    .map_err(db_error)?;

    Ok(Json(CategoryListResponse {
        categories,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages(total),
    }))
}

/// 카테고리 조회
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "카테고리 ID")),
    responses(
        (status = 200, description = "카테고리", body = CategoryRecord),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<CategoryRecord>> {
    let pool = state.pool()?;
    CategoryRepository::find_owned(pool, user.user_id, category_id)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found(CATEGORY_NOT_FOUND))
}

/// 카테고리 부분 수정
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "카테고리 ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "수정됨", body = CategoryRecord),
        (status = 400, description = "제목 중복", body = ApiErrorResponse),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<i32>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryRecord>> {
    request.validate()?;
    let pool = state.pool()?;

    if let Some(title) = &request.title {
        if CategoryRepository::title_exists(pool, user.user_id, title, Some(category_id))
            .await
            .map_err(db_error)?
        {
            return Err(bad_request(DUPLICATE_TITLE));
        }
    }

    CategoryRepository::update(
        pool,
        user.user_id,
        category_id,
        request.title.as_deref(),
        request.description.as_ref().map(Option::as_deref),
    )
    .await
    .map_err(duplicate_or_db_error)?
    .map(Json)
    .ok_or_else(|| not_found(CATEGORY_NOT_FOUND))
}

/// 카테고리 삭제 (소속 북마크는 미분류로)
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "카테고리 ID")),
    responses(
        (status = 204, description = "삭제됨"),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let pool = state.pool()?;

    if !CategoryRepository::delete(pool, user.user_id, category_id)
        .await
        .map_err(db_error)?
    {
        return Err(not_found(CATEGORY_NOT_FOUND));
    }

    info!(user_id = user.user_id, category_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn duplicate_or_db_error(err: sqlx::Error) -> crate::error::ApiError {
    if is_unique_violation(&err) {
        bad_request(DUPLICATE_TITLE)
    } else {
        db_error(err)
    }
}

// ================================================================================================
// Router
// ================================================================================================

pub fn categories_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}
