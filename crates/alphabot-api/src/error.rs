//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트가 같은 JSON 형식으로 실패를 알립니다.
//! 사용자에게 보여줄 문구는 `message`에 그대로 담습니다.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 통합 API 에러 응답.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Chat room not found or permission denied",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "DB_ERROR", "VALIDATION_ERROR", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

// ==================== Result Type Alias ====================

/// 핸들러 에러 타입.
pub type ApiError = (StatusCode, Json<ApiErrorResponse>);

/// API 핸들러 Result 타입 별칭.
///
/// ```ignore
/// async fn get_category(
///     State(state): State<Arc<AppState>>,
///     CurrentUser(user): CurrentUser,
///     Path(id): Path<i32>,
/// ) -> ApiResult<Json<CategoryRecord>> {
///     let pool = state.pool()?;
///     let category = CategoryRepository::find_owned(pool, user.user_id, id)
///         .await
///         .map_err(db_error)?
///         .ok_or_else(|| not_found("Category not found"))?;
///     Ok(Json(category))
/// }
/// ```
pub type ApiResult<T> = Result<T, ApiError>;

// ==================== 공통 에러 생성기 ====================

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (status, Json(ApiErrorResponse::new(code, message)))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, "CONFLICT", message)
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
}

/// sqlx 에러를 500으로 변환하고 로그를 남깁니다.
pub fn db_error(err: sqlx::Error) -> ApiError {
    tracing::error!(error = %err, "Database query failed");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DB_ERROR",
        format!("Database error: {}", err),
    )
}

/// PostgreSQL unique violation (23505) 여부.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

/// validator 에러 메시지를 하나의 문자열로 합칩니다.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: invalid value", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// 요청 본문 검증. 실패하면 422.
pub fn validate_request<T: validator::Validate>(request: &T) -> ApiResult<()> {
    request.validate().map_err(|errors| {
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_ERROR",
            validation_message(&errors),
        )
    })
}

// ==================== 401 응답 ====================

/// `WWW-Authenticate: Bearer` 헤더를 포함한 401 응답.
#[derive(Debug, Clone)]
pub struct Unauthorized(pub &'static str);

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        (
            StatusCode::UNAUTHORIZED,
            headers,
            Json(ApiErrorResponse::new("UNAUTHORIZED", self.0)),
        )
            .into_response()
    }
}
