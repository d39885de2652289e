//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! `Arc<AppState>`로 감싸 Axum State extractor로 주입됩니다.

use std::sync::Arc;

use alphabot_core::{env_var_opt, env_var_parse};
use tracing::warn;

use crate::error::{internal_error, ApiResult};
use crate::services::ChatModel;

/// 기본 JWT 서명 키 (개발용)
pub const DEFAULT_SECRET_KEY: &str = "secret_key";
/// 기본 Access Token 만료 (분)
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// JWT 설정.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 서명 키
    pub secret: String,
    /// Access Token 만료 시간 (분)
    pub expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET_KEY.to_string(),
            expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        }
    }
}

impl AuthConfig {
    /// `SECRET_KEY`, `ACCESS_TOKEN_EXPIRE_MINUTES`에서 로드.
    pub fn from_env() -> Self {
        let secret = env_var_opt("SECRET_KEY").unwrap_or_else(|| {
            warn!("SECRET_KEY not set, using default (INSECURE for development only)");
            DEFAULT_SECRET_KEY.to_string()
        });

        Self {
            secret,
            expire_minutes: env_var_parse(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            ),
        }
    }
}

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 데이터베이스 연결 풀 (PostgreSQL)
    pub db_pool: Option<sqlx::PgPool>,

    /// JWT 설정
    pub auth: AuthConfig,

    /// 어시스턴트 응답 생성기. 키가 없으면 None
    pub chat_model: Option<Arc<dyn ChatModel>>,

    /// 대화 앞에 붙는 system 프롬프트
    pub system_prompt: Option<String>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            db_pool: None,
            auth,
            chat_model: None,
            system_prompt: None,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 설정.
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 어시스턴트 모델 설정.
    pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// system 프롬프트 설정. 공백뿐이면 무시합니다.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    /// 풀이 없으면 500 "Database not available".
    pub fn pool(&self) -> ApiResult<&sqlx::PgPool> {
        self.db_pool
            .as_ref()
            .ok_or_else(|| internal_error("Database not available"))
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> Result<(), String> {
        let pool = self
            .db_pool
            .as_ref()
            .ok_or_else(|| "Database not configured".to_string())?;

        sqlx::query("SELECT 1")
            .fetch_one(pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// DB와 LLM 없이 라우터를 구성할 수 있는 최소 상태입니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    AppState::new(AuthConfig {
        secret: "test-secret-key-for-jwt-testing-minimum-32-chars".to_string(),
        expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_pool_missing_is_500() {
        let state = create_test_state();
        let err = state.pool().unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.1.message, "Database not available");
    }

    #[test]
    fn test_blank_system_prompt_ignored() {
        let state = create_test_state().with_system_prompt(Some("   ".to_string()));
        assert!(state.system_prompt.is_none());

        let state = create_test_state().with_system_prompt(Some("You are helpful".to_string()));
        assert_eq!(state.system_prompt.as_deref(), Some("You are helpful"));
    }

    #[tokio::test]
    async fn test_db_health_without_pool() {
        let state = create_test_state();
        assert!(state.is_db_healthy().await.is_err());
        assert!(state.uptime_secs() >= 0);
    }
}
