//! 종목 채팅 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - JWT 인증 (Argon2 비밀번호 해싱)
//! - 종목별 채팅방과 OpenAI 기반 어시스턴트 응답
//! - 북마크, 카테고리, 종목 토론 댓글
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: JWT 인증과 현재 사용자 추출
//! - [`repository`]: PostgreSQL 접근
//! - [`services`]: OpenAI 클라이언트와 채팅 응답 생성
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{hash_password, verify_password, Claims, CurrentUser, JwtError};
pub use error::{ApiErrorResponse, ApiResult};
pub use routes::*;
pub use services::{ChatModel, OpenAiClient, OpenAiConfig};
pub use state::{AppState, AuthConfig};

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
