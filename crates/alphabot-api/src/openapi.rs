//! OpenAPI 문서화 설정.
//!
//! utoipa로 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use alphabot_core::{MessageRole, TrashState};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::repository::{
    BookmarkRecord, CategoryRecord, ChatRecord, CommentAuthor, CommentRecord, MessageRecord,
};
use crate::routes::{
    auth::LoginJson,
    bookmarks::{CreateBookmarkRequest, UpdateBookmarkRequest},
    categories::{CreateCategoryRequest, UpdateCategoryRequest},
    chats::{CreateRoomRequest, MessageContentRequest},
    comments::{CreateCommentRequest, UpdateCommentRequest},
    BookmarkListResponse, CategoryListResponse, ChatReplyResponse, CommentListResponse,
    HealthResponse, ReadinessResponse, SignupRequest, TokenResponse, UpsertChatResponse,
    UserResponse,
};

// ==================== OpenAPI 문서 정의 ====================

/// AlphaBot API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AlphaBot API",
        description = r#"
# AlphaBot 종목 채팅 REST API

종목별 채팅방과 LLM 어시스턴트, 메시지 북마크, 종목 토론 게시판을 제공합니다.

## 인증

`POST /api/login`으로 받은 토큰을 `Authorization: Bearer <token>` 헤더에 담으세요.
댓글 목록과 헬스 체크를 제외한 모든 엔드포인트에 필요합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "로컬 개발 서버"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 회원 가입, 로그인"),
        (name = "chats", description = "채팅 - 채팅방, 메시지, 어시스턴트 응답"),
        (name = "categories", description = "카테고리 - 북마크 분류"),
        (name = "bookmarks", description = "북마크 - 메시지 저장"),
        (name = "comments", description = "댓글 - 종목 토론 게시판")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Common =====
            ApiErrorResponse,
            TrashState,
            MessageRole,

            // ===== Health =====
            HealthResponse,
            ReadinessResponse,

            // ===== Auth =====
            SignupRequest,
            LoginJson,
            TokenResponse,
            UserResponse,

            // ===== Chats =====
            ChatRecord,
            MessageRecord,
            CreateRoomRequest,
            MessageContentRequest,
            ChatReplyResponse,
            UpsertChatResponse,

            // ===== Categories =====
            CategoryRecord,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryListResponse,

            // ===== Bookmarks =====
            BookmarkRecord,
            CreateBookmarkRequest,
            UpdateBookmarkRequest,
            BookmarkListResponse,

            // ===== Comments =====
            CommentRecord,
            CommentAuthor,
            CreateCommentRequest,
            UpdateCommentRequest,
            CommentListResponse,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::signup,
        crate::routes::auth::login,
        crate::routes::auth::me,

        // ===== Chats =====
        crate::routes::chats::list_rooms,
        crate::routes::chats::create_room,
        crate::routes::chats::get_room_by_stock,
        crate::routes::chats::trash_room,
        crate::routes::chats::restore_room,
        crate::routes::chats::delete_room,
        crate::routes::chats::create_message,
        crate::routes::chats::list_messages,
        crate::routes::chats::chat_with_assistant,
        crate::routes::chats::upsert_chat_by_stock,

        // ===== Categories =====
        crate::routes::categories::create_category,
        crate::routes::categories::list_categories,
        crate::routes::categories::get_category,
        crate::routes::categories::update_category,
        crate::routes::categories::delete_category,

        // ===== Bookmarks =====
        crate::routes::bookmarks::create_bookmark,
        crate::routes::bookmarks::list_bookmarks,
        crate::routes::bookmarks::update_bookmark,
        crate::routes::bookmarks::delete_bookmark,

        // ===== Comments =====
        crate::routes::comments::create_comment,
        crate::routes::comments::list_comments,
        crate::routes::comments::update_comment,
        crate::routes::comments::delete_comment,
    )
)]
pub struct ApiDoc;

/// `bearer_auth` JWT 보안 스킴 등록
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        assert!(json.contains("AlphaBot API"));

        for tag in ["health", "auth", "chats", "categories", "bookmarks", "comments"] {
            assert!(json.contains(tag), "missing tag {tag}");
        }

        assert!(json.contains("/health/ready"));
        assert!(json.contains("/api/rooms/{id}/chat"));
        assert!(json.contains("/api/v1/chats/by-stock/{code}"));
        assert!(json.contains("/api/comments/{id}"));
    }

    #[test]
    fn test_openapi_registers_bearer_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("ChatReplyResponse"));
        assert!(components.schemas.contains_key("ApiErrorResponse"));
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }
}
