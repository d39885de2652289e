//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템에서 사용합니다.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" | "error"
    pub status: String,
    /// 실패 원인
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 상세 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    /// "healthy" | "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    /// "up" | "down"
    pub database: String,
    /// LLM 설정 여부
    pub assistant_configured: bool,
}

/// DB `SELECT 1` 확인.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "정상", body = HealthResponse),
        (status = 503, description = "DB 연결 실패", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.is_db_healthy().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                detail: None,
            }),
        ),
        Err(detail) => {
            tracing::warn!(%detail, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error".to_string(),
                    detail: Some(detail),
                }),
            )
        }
    }
}

/// 버전, 업타임, 구성 요소 상태.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "준비됨", body = ReadinessResponse),
        (status = 503, description = "DB 연결 실패", body = ReadinessResponse)
    ),
    tag = "health"
)]
pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_up = state.is_db_healthy().await.is_ok();
    let status_code = if db_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        status: if db_up { "healthy" } else { "unhealthy" }.to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        database: if db_up { "up" } else { "down" }.to_string(),
        assistant_configured: state.chat_model.is_some(),
    };

    (status_code, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(health_ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::state::create_test_state;

    #[tokio::test]
    async fn test_health_without_db_is_503() {
        let app = health_router().with_state(Arc::new(create_test_state()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "error");
        assert_eq!(health.detail.as_deref(), Some("Database not configured"));
    }

    #[tokio::test]
    async fn test_health_ready_reports_components() {
        let app = health_router().with_state(Arc::new(create_test_state()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let ready: ReadinessResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(ready.database, "down");
        assert!(!ready.assistant_configured);
        assert!(!ready.version.is_empty());
    }
}
