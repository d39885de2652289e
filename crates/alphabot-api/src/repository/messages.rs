//! Messages Repository
//!
//! 채팅 메시지 저장과 조회. 메시지 저장 시 채팅방의 `lastchat_at`을
//! 같은 트랜잭션에서 갱신합니다.

use alphabot_core::MessageRole;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

/// 메시지 레코드
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MessageRecord {
    pub messages_id: i32,
    pub chat_id: i32,
    pub user_id: i32,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// LLM 문맥으로 사용하는 최근 메시지 수
pub const HISTORY_LIMIT: i64 = 30;

const MESSAGE_COLUMNS: &str = "messages_id, chat_id, user_id, role, content, created_at";

/// Messages Repository
pub struct MessageRepository;

impl MessageRepository {
    /// 메시지 저장 + `chat.lastchat_at = NOW()`
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        chat_id: i32,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let message = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (user_id, chat_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(chat_id)
        .bind(role)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat SET lastchat_at = NOW() WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// 채팅방 메시지 (오래된 순). `after_id`가 있으면 그보다 큰 ID만.
    pub async fn list_by_chat(
        pool: &PgPool,
        chat_id: i32,
        after_id: Option<i32>,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE chat_id = $1
              AND ($2::int IS NULL OR messages_id > $2)
            ORDER BY messages_id ASC
            "#
        ))
        .bind(chat_id)
        .bind(after_id)
        .fetch_all(pool)
        .await
    }

    /// 최근 `limit`개 메시지를 시간 순으로 반환
    pub async fn recent_by_chat(
        pool: &PgPool,
        chat_id: i32,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let mut messages = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE chat_id = $1
            ORDER BY messages_id DESC
            LIMIT $2
            "#
        ))
        .bind(chat_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// 사용자 채팅방에 속한 메시지인지 확인
    pub async fn is_owned_by(
        pool: &PgPool,
        user_id: i32,
        messages_id: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM messages m
                JOIN chat c ON c.chat_id = m.chat_id
                WHERE m.messages_id = $1 AND c.user_id = $2
            )
            "#,
        )
        .bind(messages_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{test_db, ChatRepository};

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_create_touches_lastchat_and_orders_history() {
        let pool = test_db::connect().await;
        let owner = test_db::create_user(&pool).await;
        let other = test_db::create_user(&pool).await;

        let chat = ChatRepository::create(&pool, owner.user_id, "room", None)
            .await
            .unwrap();
        assert!(chat.lastchat_at.is_none());

        let mut ids = Vec::new();
        for (role, content) in [
            (MessageRole::User, "1"),
            (MessageRole::Assistant, "2"),
            (MessageRole::User, "3"),
        ] {
            let message =
                MessageRepository::create(&pool, owner.user_id, chat.chat_id, role, content)
                    .await
                    .unwrap();
            ids.push(message.messages_id);
        }

        let chat = ChatRepository::find_owned(&pool, owner.user_id, chat.chat_id)
            .await
            .unwrap()
            .unwrap();
        assert!(chat.lastchat_at.is_some());

        let recent = MessageRepository::recent_by_chat(&pool, chat.chat_id, 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3"]);

        let after = MessageRepository::list_by_chat(&pool, chat.chat_id, Some(ids[0]))
            .await
            .unwrap();
        assert_eq!(after.len(), 2);

        assert!(MessageRepository::is_owned_by(&pool, owner.user_id, ids[0]).await.unwrap());
        assert!(!MessageRepository::is_owned_by(&pool, other.user_id, ids[0]).await.unwrap());

        test_db::delete_user(&pool, owner.user_id).await;
        test_db::delete_user(&pool, other.user_id).await;
    }
}
