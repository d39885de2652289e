//! Bookmarks Repository
//!
//! 사용자가 저장한 채팅 메시지. 카테고리가 없으면 미분류입니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

/// 북마크 레코드
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookmarkRecord {
    pub bookmark_id: i32,
    pub user_id: i32,
    pub messages_id: i32,
    pub category_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

const BOOKMARK_COLUMNS: &str = "bookmark_id, user_id, messages_id, category_id, created_at";

/// Bookmarks Repository
pub struct BookmarkRepository;

impl BookmarkRepository {
    /// 북마크 생성
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        messages_id: i32,
        category_id: Option<i32>,
    ) -> Result<BookmarkRecord, sqlx::Error> {
        sqlx::query_as::<_, BookmarkRecord>(&format!(
            r#"
            INSERT INTO bookmark (user_id, messages_id, category_id)
            VALUES ($1, $2, $3)
            RETURNING {BOOKMARK_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(messages_id)
        .bind(category_id)
        .fetch_one(pool)
        .await
    }

    /// 본인 북마크 조회
    pub async fn find_owned(
        pool: &PgPool,
        user_id: i32,
        bookmark_id: i32,
    ) -> Result<Option<BookmarkRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkRecord>(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark WHERE bookmark_id = $1 AND user_id = $2"
        ))
        .bind(bookmark_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 사용자 북마크 목록 (최신순). `category_id`가 없으면 전체.
    pub async fn list(
        pool: &PgPool,
        user_id: i32,
        category_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookmarkRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkRecord>(&format!(
            r#"
            SELECT {BOOKMARK_COLUMNS}
            FROM bookmark
            WHERE user_id = $1
              AND ($2::int IS NULL OR category_id = $2)
            ORDER BY created_at DESC, bookmark_id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 목록 전체 개수
    pub async fn count(
        pool: &PgPool,
        user_id: i32,
        category_id: Option<i32>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bookmark
            WHERE user_id = $1
              AND ($2::int IS NULL OR category_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_one(pool)
        .await
    }

    /// 카테고리 이동 (None이면 미분류)
    pub async fn update_category(
        pool: &PgPool,
        user_id: i32,
        bookmark_id: i32,
        category_id: Option<i32>,
    ) -> Result<Option<BookmarkRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkRecord>(&format!(
            r#"
            UPDATE bookmark SET category_id = $3
            WHERE bookmark_id = $1 AND user_id = $2
            RETURNING {BOOKMARK_COLUMNS}
            "#
        ))
        .bind(bookmark_id)
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(pool)
        .await
    }

    /// 본인 북마크 삭제
    pub async fn delete(pool: &PgPool, user_id: i32, bookmark_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmark WHERE bookmark_id = $1 AND user_id = $2")
            .bind(bookmark_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
