//! 종목 채팅 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 인증, 채팅방/메시지, 북마크, 종목 토론 댓글 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use alphabot_api::openapi::swagger_ui_router;
use alphabot_api::routes::create_api_router;
use alphabot_api::services::{OpenAiClient, OpenAiConfig};
use alphabot_api::state::{AppState, AuthConfig};
use alphabot_core::{env_var_bool, env_var_opt, env_var_parse, init_logging, load_dotenv, LogConfig};
use alphabot_data::{Database, DatabaseConfig};

/// 서버 설정 구조체.
struct ServerConfig {
    /// 바인딩할 호스트 주소
    host: String,
    /// 바인딩할 포트
    port: u16,
    /// 시작 시 마이그레이션 실행 여부
    run_migrations: bool,
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드.
    fn from_env() -> Self {
        Self {
            host: env_var_opt("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_var_parse("API_PORT", 8000),
            run_migrations: env_var_bool("RUN_MIGRATIONS", false),
        }
    }

    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// DB, LLM 클라이언트를 연결한 AppState 생성.
///
/// DB 연결에 실패해도 서버는 뜨며, DB가 필요한 핸들러는 500을 반환합니다.
async fn create_app_state(config: &ServerConfig) -> AppState {
    let mut state = AppState::new(AuthConfig::from_env());

    match DatabaseConfig::from_env() {
        Ok(db_config) => match Database::connect(&db_config).await {
            Ok(db) => {
                if config.run_migrations {
                    if let Err(e) = db.migrate().await {
                        error!(error = %e, "Failed to run migrations");
                    }
                }
                state = state.with_db_pool(db.into_pool());
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to database");
            }
        },
        Err(e) => {
            warn!(error = %e, "Database not configured, running without DB");
        }
    }

    match OpenAiConfig::from_env() {
        Some(openai_config) => match OpenAiClient::new(openai_config) {
            Ok(client) => {
                info!(model = client.model(), "OpenAI client initialized");
                state = state.with_chat_model(Arc::new(client));
            }
            Err(e) => {
                error!(error = %e, "Failed to create OpenAI client");
            }
        },
        None => {
            warn!("OPENAI_API_KEY not set, assistant replies are disabled");
        }
    }

    state.with_system_prompt(env_var_opt("OPENAI_SYSTEM_PROMPT"))
}

/// CORS 레이어 생성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
///
/// # 환경변수
///
/// - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록
///   예: `http://localhost:3000,https://alphabot.example.com`
fn cors_layer() -> CorsLayer {
    let configured = env_var_opt("CORS_ORIGINS");

    let allow_origin = match configured.as_deref() {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        None => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        // 와일드카드 origin과 credentials는 함께 쓸 수 없음
        .allow_credentials(configured.is_some())
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_api_router().with_state(state))
        .merge(swagger_ui_router())
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그 또는 `EXPORT_OPENAPI` 환경변수가 설정된 경우
/// OpenAPI JSON 스펙을 stdout으로 출력하고 종료합니다.
fn handle_export_openapi() -> Result<(), Box<dyn std::error::Error>> {
    use alphabot_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    let export_flag = std::env::args().any(|arg| arg == "--export-openapi");
    let export_env = env_var_bool("EXPORT_OPENAPI", false);

    if export_flag || export_env {
        let json = serde_json::to_string_pretty(&ApiDoc::openapi())?;
        println!("{}", json);
        std::process::exit(0);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // OpenAPI 내보내기 처리 (서버 시작 전)
    handle_export_openapi()?;

    init_logging(LogConfig::from_env("alphabot_api=info,tower_http=debug"))?;

    info!("Starting AlphaBot API server...");

    let config = ServerConfig::from_env();
    let addr = config.socket_addr().map_err(|e| {
        error!(
            host = %config.host,
            port = config.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
        );
        e
    })?;

    let state = Arc::new(create_app_state(&config).await);

    info!(version = %state.version, "Application state initialized");
    info!(
        has_db = state.db_pool.is_some(),
        has_assistant = state.chat_model.is_some(),
        has_system_prompt = state.system_prompt.is_some(),
        "Service connections status"
    );

    let app = create_router(state.clone());

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown initiated, cleaning up...");

    if let Some(pool) = &state.db_pool {
        if tokio::time::timeout(Duration::from_secs(10), pool.close())
            .await
            .is_err()
        {
            warn!("Database pool close timed out");
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 기다리지 않습니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
