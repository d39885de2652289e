//! Chats Repository
//!
//! 채팅방 조회/생성/휴지통 처리를 담당합니다.
//! 사용자/종목 조합당 활성(`trash_can = 'out'`) 채팅방은 `ux_chat_user_stock_active`
//! 부분 유니크 인덱스로 하나만 허용됩니다.

use alphabot_core::{StockCode, TrashState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::is_unique_violation;

// ================================================================================================
// Types
// ================================================================================================

/// 채팅방 레코드
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ChatRecord {
    pub chat_id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub title: String,
    pub stock_code: Option<String>,
    pub trash_can: TrashState,
    pub created_at: DateTime<Utc>,
    pub lastchat_at: Option<DateTime<Utc>>,
}

/// upsert-by-stock 결과
#[derive(Debug, Clone)]
pub struct UpsertedChat {
    pub chat: ChatRecord,
    /// 이미 활성 채팅방이 있었는지
    pub existed: bool,
}

const CHAT_COLUMNS: &str =
    "chat_id, user_id, title, stock_code, trash_can, created_at, lastchat_at";

/// 제목이 비어 있을 때 사용하는 기본 제목
pub fn default_chat_title(code: &StockCode) -> String {
    format!("{} 채팅", code)
}

// ================================================================================================
// Repository
// ================================================================================================

/// Chats Repository
pub struct ChatRepository;

impl ChatRepository {
    // ============================================================================================
    // 조회
    // ============================================================================================

    /// 사용자 채팅방 목록 (최근 대화 순)
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: i32,
        trash: Option<TrashState>,
    ) -> Result<Vec<ChatRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chat
            WHERE user_id = $1
              AND ($2::trash_enum IS NULL OR trash_can = $2)
            ORDER BY lastchat_at DESC NULLS LAST, chat_id DESC
            "#
        ))
        .bind(user_id)
        .bind(trash)
        .fetch_all(pool)
        .await
    }

    /// 본인 소유 채팅방 조회
    pub async fn find_owned(
        pool: &PgPool,
        user_id: i32,
        chat_id: i32,
    ) -> Result<Option<ChatRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat WHERE chat_id = $1 AND user_id = $2"
        ))
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 종목의 활성 채팅방
    pub async fn find_active_by_stock(
        pool: &PgPool,
        user_id: i32,
        stock_code: &StockCode,
    ) -> Result<Option<ChatRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chat
            WHERE user_id = $1 AND stock_code = $2 AND trash_can = 'out'
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(stock_code.as_str())
        .fetch_optional(pool)
        .await
    }

    /// 종목의 가장 최근 휴지통 채팅방 (chat_id 최대)
    pub async fn find_latest_trashed_by_stock(
        pool: &PgPool,
        user_id: i32,
        stock_code: &StockCode,
    ) -> Result<Option<ChatRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chat
            WHERE user_id = $1 AND stock_code = $2 AND trash_can = 'in'
            ORDER BY chat_id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(stock_code.as_str())
        .fetch_optional(pool)
        .await
    }

    // ============================================================================================
    // 생성/수정
    // ============================================================================================

    /// 활성 채팅방 생성
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        title: &str,
        stock_code: Option<&StockCode>,
    ) -> Result<ChatRecord, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            INSERT INTO chat (user_id, title, stock_code, trash_can)
            VALUES ($1, $2, $3, 'out')
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(stock_code.map(StockCode::as_str))
        .fetch_one(pool)
        .await
    }

    /// 휴지통 상태 변경. 복원 시 같은 종목의 활성 채팅방이 있으면 unique violation.
    pub async fn set_trash_state(
        pool: &PgPool,
        user_id: i32,
        chat_id: i32,
        state: TrashState,
    ) -> Result<Option<ChatRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            UPDATE chat SET trash_can = $3
            WHERE chat_id = $1 AND user_id = $2
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(chat_id)
        .bind(user_id)
        .bind(state)
        .fetch_optional(pool)
        .await
    }

    /// 휴지통 채팅방 복원 (제목 교체 선택)
    async fn restore_with_title(
        pool: &PgPool,
        chat_id: i32,
        title: Option<&str>,
    ) -> Result<ChatRecord, sqlx::Error> {
        sqlx::query_as::<_, ChatRecord>(&format!(
            r#"
            UPDATE chat
            SET trash_can = 'out', title = COALESCE($2, title)
            WHERE chat_id = $1
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(chat_id)
        .bind(title)
        .fetch_one(pool)
        .await
    }

    /// 채팅방 삭제 (메시지는 CASCADE)
    pub async fn delete(pool: &PgPool, user_id: i32, chat_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chat WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================================================================
    // 종목 채팅방
    // ============================================================================================

    /// 종목 채팅방을 찾거나, 휴지통에서 복원하거나, 새로 만듭니다.
    ///
    /// 1. 활성 채팅방이 있으면 그대로 (`existed = true`)
    /// 2. 휴지통의 가장 최근 채팅방을 복원 (제목이 있으면 교체)
    /// 3. 없으면 새로 생성 (제목이 비면 `"{CODE} 채팅"`)
    ///
    /// 2, 3 단계에서 동시 요청으로 unique violation이 나면 활성 채팅방을 다시 읽습니다.
    pub async fn upsert_by_stock(
        pool: &PgPool,
        user_id: i32,
        stock_code: &StockCode,
        title: Option<&str>,
    ) -> Result<UpsertedChat, sqlx::Error> {
        if let Some(chat) = Self::find_active_by_stock(pool, user_id, stock_code).await? {
            return Ok(UpsertedChat {
                chat,
                existed: true,
            });
        }

        let title = title.map(str::trim).filter(|t| !t.is_empty());

        let attempt = match Self::find_latest_trashed_by_stock(pool, user_id, stock_code).await? {
            Some(trashed) => {
                debug!(
                    user_id,
                    chat_id = trashed.chat_id,
                    stock_code = %stock_code,
                    "Restoring trashed chat room"
                );
                Self::restore_with_title(pool, trashed.chat_id, title).await
            }
            None => {
                let title = title
                    .map(str::to_string)
                    .unwrap_or_else(|| default_chat_title(stock_code));
                Self::create(pool, user_id, &title, Some(stock_code)).await
            }
        };

        match attempt {
            Ok(chat) => {
                info!(user_id, chat_id = chat.chat_id, stock_code = %stock_code, "Chat room ready");
                Ok(UpsertedChat {
                    chat,
                    existed: false,
                })
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(user_id, stock_code = %stock_code, "Concurrent upsert detected, re-reading");
                match Self::find_active_by_stock(pool, user_id, stock_code).await? {
                    Some(chat) => Ok(UpsertedChat {
                        chat,
                        existed: true,
                    }),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}
