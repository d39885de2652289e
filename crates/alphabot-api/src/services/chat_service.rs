//! 채팅 응답 생성 서비스.
//!
//! 사용자 메시지를 저장하고, 최근 이력과 system 프롬프트로 LLM을 호출한 뒤
//! 어시스턴트 메시지를 저장합니다. LLM 호출이 실패해도 사용자 메시지는 남습니다.

use alphabot_core::MessageRole;
use axum::http::StatusCode;
use sqlx::PgPool;
use tracing::{info, warn};

use super::openai::{ChatModel, ChatTurn, OpenAiError};
use crate::error::{api_error, db_error, ApiError};
use crate::repository::{MessageRecord, MessageRepository, HISTORY_LIMIT};

/// 채팅 서비스 에러.
#[derive(Debug, thiserror::Error)]
pub enum ChatServiceError {
    #[error("OpenAI API key is not configured")]
    NotConfigured,

    #[error("OpenAI chat completion failed: {0}")]
    Completion(OpenAiError),

    #[error("OpenAI returned empty response")]
    EmptyResponse,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<OpenAiError> for ChatServiceError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::EmptyResponse => Self::EmptyResponse,
            other => Self::Completion(other),
        }
    }
}

impl ChatServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Completion(_) | Self::EmptyResponse => StatusCode::BAD_GATEWAY,
        }
    }

    /// HTTP 에러 응답으로 변환
    pub fn into_api_error(self) -> ApiError {
        match self {
            Self::Database(e) => db_error(e),
            Self::NotConfigured => api_error(self.status(), "LLM_NOT_CONFIGURED", self.to_string()),
            Self::Completion(_) | Self::EmptyResponse => {
                api_error(self.status(), "LLM_ERROR", self.to_string())
            }
        }
    }
}

/// 사용자 메시지와 어시스턴트 응답 쌍.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub user_message: MessageRecord,
    pub assistant_message: MessageRecord,
}

/// 저장된 이력을 LLM 입력으로 변환 (system 프롬프트가 맨 앞).
pub fn build_prompt(history: &[MessageRecord], system_prompt: Option<&str>) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() + 1);

    if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
        turns.push(ChatTurn::new(MessageRole::System, prompt));
    }

    turns.extend(
        history
            .iter()
            .map(|m| ChatTurn::new(m.role, m.content.clone())),
    );
    turns
}

/// LLM 호출. 모델이 없으면 `NotConfigured`.
pub async fn generate_reply(
    model: Option<&dyn ChatModel>,
    turns: &[ChatTurn],
) -> Result<String, ChatServiceError> {
    let model = model.ok_or(ChatServiceError::NotConfigured)?;

    let reply = model.complete(turns).await?;
    if reply.trim().is_empty() {
        return Err(ChatServiceError::EmptyResponse);
    }
    Ok(reply)
}

/// 사용자 메시지 저장 → 최근 30개 이력으로 LLM 호출 → 어시스턴트 메시지 저장.
///
/// 채팅방 소유권은 호출자가 먼저 확인합니다.
pub async fn create_message_and_reply(
    pool: &PgPool,
    model: Option<&dyn ChatModel>,
    system_prompt: Option<&str>,
    user_id: i32,
    chat_id: i32,
    content: &str,
) -> Result<ChatExchange, ChatServiceError> {
    let user_message =
        MessageRepository::create(pool, user_id, chat_id, MessageRole::User, content).await?;

    let history = MessageRepository::recent_by_chat(pool, chat_id, HISTORY_LIMIT).await?;
    let turns = build_prompt(&history, system_prompt);

    let reply = generate_reply(model, &turns).await.map_err(|e| {
        warn!(user_id, chat_id, error = %e, "Assistant reply failed");
        e
    })?;

    let assistant_message =
        MessageRepository::create(pool, user_id, chat_id, MessageRole::Assistant, &reply).await?;

    info!(
        user_id,
        chat_id,
        history = history.len(),
        "Assistant reply stored"
    );

    Ok(ChatExchange {
        user_message,
        assistant_message,
    })
}
