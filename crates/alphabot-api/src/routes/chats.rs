//! 채팅방, 메시지, 어시스턴트 응답 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/rooms` - 채팅방 목록 (`?trash=in|out`)
//! - `POST /api/rooms` - 채팅방 생성 (종목 활성 채팅방이 있으면 재사용)
//! - `GET /api/rooms/by-stock/{code}` - 종목 활성 채팅방
//! - `PUT /api/rooms/{id}/trash`, `PUT /api/rooms/{id}/restore` - 휴지통 이동/복원
//! - `DELETE /api/rooms/{id}` - 채팅방 삭제
//! - `GET|POST /api/rooms/{id}/messages` - 메시지 조회/저장
//! - `POST /api/rooms/{id}/chat` - 메시지 저장 후 어시스턴트 응답
//! - `PUT /api/v1/chats/by-stock/{code}` - 종목 채팅방 upsert

use alphabot_core::{MessageRole, StockCode, TrashState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::parse_stock_code;
use crate::auth::CurrentUser;
use crate::error::{
    conflict, db_error, is_unique_violation, not_found, validate_request, ApiErrorResponse,
    ApiResult,
};
use crate::repository::{ChatRecord, ChatRepository, MessageRecord, MessageRepository};
use crate::services::create_message_and_reply;
use crate::state::AppState;

const ROOM_NOT_FOUND: &str = "Chat room not found or permission denied";
const STOCK_ROOM_NOT_FOUND: &str = "Chat room for stock not found";

// ================================================================================================
// Request/Response Types
// ================================================================================================

/// 채팅방 목록 필터
#[derive(Debug, Deserialize, IntoParams)]
pub struct RoomListQuery {
    /// "in" (휴지통) | "out" (활성)
    pub trash: Option<TrashState>,
}

/// 채팅방 생성 요청
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,
    pub stock_code: Option<String>,
}

/// 메시지 본문
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MessageContentRequest {
    #[validate(custom(function = not_blank, message = "content must not be blank"))]
    pub content: String,
}

/// 메시지 목록 커서
#[derive(Debug, Deserialize, IntoParams)]
pub struct MessageListQuery {
    /// 이 ID보다 큰 메시지만
    pub last_message_id: Option<i32>,
}

/// 종목 채팅방 upsert 쿼리
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct UpsertChatQuery {
    #[validate(length(max = 100, message = "title must be at most 100 characters"))]
    pub title: Option<String>,
}

/// 종목 채팅방 upsert 응답
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertChatResponse {
    pub chat_id: i32,
    pub title: String,
    pub stock_code: Option<String>,
    /// 이미 활성 채팅방이 있었는지
    pub existed: bool,
}

/// 사용자 메시지와 어시스턴트 응답
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatReplyResponse {
    pub user_message: MessageRecord,
    pub assistant_message: MessageRecord,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// 본인 채팅방 확인. 없거나 남의 것이면 404.
async fn owned_room(state: &AppState, user_id: i32, chat_id: i32) -> ApiResult<ChatRecord> {
    let pool = state.pool()?;
    ChatRepository::find_owned(pool, user_id, chat_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(ROOM_NOT_FOUND))
}

// ================================================================================================
// Rooms
// ================================================================================================

/// 채팅방 목록 (최근 대화 순)
#[utoipa::path(
    get,
    path = "/api/rooms",
    params(RoomListQuery),
    responses(
        (status = 200, description = "채팅방 목록", body = Vec<ChatRecord>),
        (status = 401, description = "인증 실패", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RoomListQuery>,
) -> ApiResult<Json<Vec<ChatRecord>>> {
    let pool = state.pool()?;
    let rooms = ChatRepository::list_by_user(pool, user.user_id, query.trash)
        .await
        .map_err(db_error)?;
    Ok(Json(rooms))
}

/// 채팅방 생성. 같은 종목의 활성 채팅방이 있으면 200으로 그대로 반환.
#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "기존 활성 채팅방", body = ChatRecord),
        (status = 201, description = "생성됨", body = ChatRecord),
        (status = 400, description = "잘못된 종목 코드", body = ApiErrorResponse),
        (status = 422, description = "입력값 오류", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<ChatRecord>)> {
    validate_request(&request)?;
    let stock_code = request
        .stock_code
        .as_deref()
        .map(parse_stock_code)
        .transpose()?;
    let pool = state.pool()?;

    if let Some(code) = &stock_code {
        if let Some(existing) = ChatRepository::find_active_by_stock(pool, user.user_id, code)
            .await
            .map_err(db_error)?
        {
            return Ok((StatusCode::OK, Json(existing)));
        }
    }

    let created = ChatRepository::create(pool, user.user_id, &request.title, stock_code.as_ref())
        .await;

    match created {
        Ok(room) => {
            info!(user_id = user.user_id, chat_id = room.chat_id, "Chat room created");
            Ok((StatusCode::CREATED, Json(room)))
        }
        // 동시 생성: 먼저 만들어진 활성 채팅방 반환
        Err(e) if is_unique_violation(&e) => {
            let code = stock_code.as_ref().ok_or_else(|| db_error(e))?;
            let existing = ChatRepository::find_active_by_stock(pool, user.user_id, code)
                .await
                .map_err(db_error)?
                .ok_or_else(|| conflict("Active chat room for stock already exists"))?;
            Ok((StatusCode::OK, Json(existing)))
        }
        Err(e) => Err(db_error(e)),
    }
}

/// 종목 활성 채팅방
#[utoipa::path(
    get,
    path = "/api/rooms/by-stock/{code}",
    params(("code" = String, Path, description = "종목 코드")),
    responses(
        (status = 200, description = "활성 채팅방", body = ChatRecord),
        (status = 400, description = "잘못된 종목 코드", body = ApiErrorResponse),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn get_room_by_stock(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> ApiResult<Json<ChatRecord>> {
    let code = parse_stock_code(&code)?;
    let pool = state.pool()?;

    ChatRepository::find_active_by_stock(pool, user.user_id, &code)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found(STOCK_ROOM_NOT_FOUND))
}

/// 휴지통으로 이동
#[utoipa::path(
    put,
    path = "/api/rooms/{id}/trash",
    params(("id" = i32, Path, description = "채팅방 ID")),
    responses(
        (status = 200, description = "이동됨", body = ChatRecord),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn trash_room(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
) -> ApiResult<Json<ChatRecord>> {
    set_trash_state(&state, user.user_id, chat_id, TrashState::In).await
}

/// 휴지통에서 복원. 같은 종목의 활성 채팅방이 있으면 409.
#[utoipa::path(
    put,
    path = "/api/rooms/{id}/restore",
    params(("id" = i32, Path, description = "채팅방 ID")),
    responses(
        (status = 200, description = "복원됨", body = ChatRecord),
        (status = 404, description = "없음", body = ApiErrorResponse),
        (status = 409, description = "활성 채팅방 중복", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn restore_room(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
) -> ApiResult<Json<ChatRecord>> {
    set_trash_state(&state, user.user_id, chat_id, TrashState::Out).await
}

async fn set_trash_state(
    state: &AppState,
    user_id: i32,
    chat_id: i32,
    trash: TrashState,
) -> ApiResult<Json<ChatRecord>> {
    let pool = state.pool()?;

    let room = ChatRepository::set_trash_state(pool, user_id, chat_id, trash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict("Another active chat room exists for this stock")
            } else {
                db_error(e)
            }
        })?
        .ok_or_else(|| not_found(ROOM_NOT_FOUND))?;

    debug!(user_id, chat_id, trash = %trash, "Chat room trash state changed");
    Ok(Json(room))
}

/// 채팅방 삭제 (메시지 포함)
#[utoipa::path(
    delete,
    path = "/api/rooms/{id}",
    params(("id" = i32, Path, description = "채팅방 ID")),
    responses(
        (status = 204, description = "삭제됨"),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let pool = state.pool()?;

    if !ChatRepository::delete(pool, user.user_id, chat_id)
        .await
        .map_err(db_error)?
    {
        return Err(not_found(ROOM_NOT_FOUND));
    }

    info!(user_id = user.user_id, chat_id, "Chat room deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ================================================================================================
// Messages
// ================================================================================================

/// 사용자 메시지 저장
#[utoipa::path(
    post,
    path = "/api/rooms/{id}/messages",
    params(("id" = i32, Path, description = "채팅방 ID")),
    request_body = MessageContentRequest,
    responses(
        (status = 200, description = "저장됨", body = MessageRecord),
        (status = 404, description = "없음", body = ApiErrorResponse),
        (status = 422, description = "빈 내용", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
    Json(request): Json<MessageContentRequest>,
) -> ApiResult<Json<MessageRecord>> {
    validate_request(&request)?;
    owned_room(&state, user.user_id, chat_id).await?;
    let pool = state.pool()?;

    let message = MessageRepository::create(
        pool,
        user.user_id,
        chat_id,
        MessageRole::User,
        &request.content,
    )
    .await
    .map_err(db_error)?;

    Ok(Json(message))
}

/// 채팅방 메시지 (오래된 순)
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/messages",
    params(("id" = i32, Path, description = "채팅방 ID"), MessageListQuery),
    responses(
        (status = 200, description = "메시지 목록", body = Vec<MessageRecord>),
        (status = 404, description = "없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
    Query(query): Query<MessageListQuery>,
) -> ApiResult<Json<Vec<MessageRecord>>> {
    owned_room(&state, user.user_id, chat_id).await?;
    let pool = state.pool()?;

    let messages = MessageRepository::list_by_chat(pool, chat_id, query.last_message_id)
        .await
        .map_err(db_error)?;
    Ok(Json(messages))
}

/// 메시지 저장 후 어시스턴트 응답 생성
#[utoipa::path(
    post,
    path = "/api/rooms/{id}/chat",
    params(("id" = i32, Path, description = "채팅방 ID")),
    request_body = MessageContentRequest,
    responses(
        (status = 200, description = "응답 생성", body = ChatReplyResponse),
        (status = 404, description = "없음", body = ApiErrorResponse),
        (status = 500, description = "LLM 미설정", body = ApiErrorResponse),
        (status = 502, description = "LLM 호출 실패", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn chat_with_assistant(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<i32>,
    Json(request): Json<MessageContentRequest>,
) -> ApiResult<Json<ChatReplyResponse>> {
    validate_request(&request)?;
    owned_room(&state, user.user_id, chat_id).await?;
    let pool = state.pool()?;

    let exchange = create_message_and_reply(
        pool,
        state.chat_model.as_deref(),
        state.system_prompt.as_deref(),
        user.user_id,
        chat_id,
        &request.content,
    )
    .await
    .map_err(|e| e.into_api_error())?;

    Ok(Json(ChatReplyResponse {
        user_message: exchange.user_message,
        assistant_message: exchange.assistant_message,
    }))
}

// ================================================================================================
// Upsert by stock
// ================================================================================================

/// 종목 채팅방을 찾거나, 휴지통에서 복원하거나, 새로 만듭니다.
#[utoipa::path(
    put,
    path = "/api/v1/chats/by-stock/{code}",
    params(("code" = String, Path, description = "종목 코드"), UpsertChatQuery),
    responses(
        (status = 200, description = "채팅방", body = UpsertChatResponse),
        (status = 400, description = "잘못된 종목 코드", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chats"
)]
pub async fn upsert_chat_by_stock(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
    Query(query): Query<UpsertChatQuery>,
) -> ApiResult<Json<UpsertChatResponse>> {
    validate_request(&query)?;
    let code: StockCode = parse_stock_code(&code)?;
    let pool = state.pool()?;

    let upserted = ChatRepository::upsert_by_stock(pool, user.user_id, &code, query.title.as_deref())
        .await
        .map_err(db_error)?;

    Ok(Json(UpsertChatResponse {
        chat_id: upserted.chat.chat_id,
        title: upserted.chat.title,
        stock_code: upserted.chat.stock_code,
        existed: upserted.existed,
    }))
}

// ================================================================================================
// Router
// ================================================================================================

pub fn chats_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/by-stock/{code}", get(get_room_by_stock))
        .route("/rooms/{id}", axum::routing::delete(delete_room))
        .route("/rooms/{id}/trash", put(trash_room))
        .route("/rooms/{id}/restore", put(restore_room))
        .route("/rooms/{id}/messages", get(list_messages).post(create_message))
        .route("/rooms/{id}/chat", post(chat_with_assistant))
        .route("/v1/chats/by-stock/{code}", put(upsert_chat_by_stock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::repository::test_db;
    use crate::routes::test_support::{app, bearer, bearer_for, body_json, db_app, json_request};

    #[test]
    fn test_message_content_must_not_be_blank() {
        let err = validate_request(&MessageContentRequest {
            content: "  \n".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.1.message, "content must not be blank");

        assert!(validate_request(&MessageContentRequest {
            content: "NVDA 전망은?".to_string(),
        })
        .is_ok());
    }

    #[test]
    fn test_room_title_length() {
        let err = validate_request(&CreateRoomRequest {
            title: String::new(),
            stock_code: None,
        })
        .unwrap_err();
        assert_eq!(err.1.message, "title must be 1-100 characters");

        let err = validate_request(&UpsertChatQuery {
            title: Some("x".repeat(101)),
        })
        .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(validate_request(&UpsertChatQuery { title: None }).is_ok());
    }

    #[test]
    fn test_trash_query_parses_lowercase() {
        let query: RoomListQuery = serde_json::from_str(r#"{"trash":"in"}"#).unwrap();
        assert_eq!(query.trash, Some(TrashState::In));
    }

    #[tokio::test]
    async fn test_rooms_require_auth() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/api/rooms").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upsert_requires_auth() {
        let (app, _) = app();
        let response = app
            .oneshot(json_request("PUT", "/api/v1/chats/by-stock/nvda", None, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_chat_without_db_is_500() {
        let (app, state) = app();
        let auth = bearer(&state);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/rooms/1/chat",
                Some(&auth),
                r#"{"content":"hello"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Database not available");
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_restore_with_active_room_is_409() {
        let pool = test_db::connect().await;
        let user = test_db::create_user(&pool).await;
        let code = StockCode::normalize("AMZN").unwrap();

        let trashed = ChatRepository::create(&pool, user.user_id, "old", Some(&code))
            .await
            .unwrap();
        ChatRepository::set_trash_state(&pool, user.user_id, trashed.chat_id, TrashState::In)
            .await
            .unwrap();
        ChatRepository::create(&pool, user.user_id, "new", Some(&code))
            .await
            .unwrap();

        let (app, state) = db_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/rooms/{}/restore", trashed.chat_id),
                Some(&bearer_for(&state, &user.login_id)),
                "",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["message"],
            "Another active chat room exists for this stock"
        );

        test_db::delete_user(&pool, user.user_id).await;
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_other_users_room_is_404() {
        let pool = test_db::connect().await;
        let owner = test_db::create_user(&pool).await;
        let other = test_db::create_user(&pool).await;

        let room = ChatRepository::create(&pool, owner.user_id, "mine", None)
            .await
            .unwrap();

        let (app, state) = db_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/rooms/{}/trash", room.chat_id),
                Some(&bearer_for(&state, &other.login_id)),
                "",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], ROOM_NOT_FOUND);

        test_db::delete_user(&pool, owner.user_id).await;
        test_db::delete_user(&pool, other.user_id).await;
    }
}
