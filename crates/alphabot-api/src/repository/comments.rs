//! Comments Repository
//!
//! 종목 토론 게시판 댓글. 응답에는 작성자 정보가 함께 들어갑니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

// ================================================================================================
// Types
// ================================================================================================

/// 작성자 정보
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentAuthor {
    pub user_id: i32,
    pub username: String,
}

/// 댓글 + 작성자 조인 행
#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    comment_id: i32,
    stock_code: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    user_id: i32,
    username: String,
}

/// 댓글 응답
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentRecord {
    pub comment_id: i32,
    pub stock_code: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user: CommentAuthor,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            comment_id: row.comment_id,
            stock_code: row.stock_code,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: CommentAuthor {
                user_id: row.user_id,
                username: row.username,
            },
        }
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.comment_id, c.stock_code, c.content, c.created_at, c.updated_at,
           u.user_id, u.username
    FROM comment c
    JOIN users u ON u.user_id = c.user_id
"#;

// ================================================================================================
// Repository
// ================================================================================================

/// Comments Repository
pub struct CommentRepository;

impl CommentRepository {
    /// 댓글 조회 (작성자 포함)
    pub async fn find_by_id(
        pool: &PgPool,
        comment_id: i32,
    ) -> Result<Option<CommentRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.comment_id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(CommentRecord::from))
    }

    /// 댓글 작성
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        stock_code: &str,
        content: &str,
    ) -> Result<CommentRecord, sqlx::Error> {
        let comment_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO comment (user_id, stock_code, content)
            VALUES ($1, $2, $3)
            RETURNING comment_id
            "#,
        )
        .bind(user_id)
        .bind(stock_code)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, comment_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// 목록 (최신순). `stock_code`가 있으면 해당 종목만.
    pub async fn list(
        pool: &PgPool,
        stock_code: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            {COMMENT_SELECT}
            WHERE ($1::text IS NULL OR c.stock_code = $1)
            ORDER BY c.created_at DESC, c.comment_id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(stock_code)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    /// 목록 전체 개수
    pub async fn count(pool: &PgPool, stock_code: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comment WHERE ($1::text IS NULL OR stock_code = $1)")
            .bind(stock_code)
            .fetch_one(pool)
            .await
    }

    /// 본인 댓글 수정 (`updated_at` 갱신)
    pub async fn update(
        pool: &PgPool,
        user_id: i32,
        comment_id: i32,
        content: &str,
    ) -> Result<Option<CommentRecord>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE comment SET content = $3, updated_at = NOW()
            WHERE comment_id = $1 AND user_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(content)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, comment_id).await
    }

    /// 본인 댓글 삭제
    pub async fn delete(pool: &PgPool, user_id: i32, comment_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comment WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_db;

    #[test]
    fn test_comment_record_nests_author() {
        let row = CommentRow {
            comment_id: 3,
            stock_code: "TSLA".to_string(),
            content: "실적 기대".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            user_id: 9,
            username: "tester".to_string(),
        };

        let json = serde_json::to_value(CommentRecord::from(row)).unwrap();
        assert_eq!(json["user"]["user_id"], 9);
        assert_eq!(json["user"]["username"], "tester");
        assert_eq!(json["stock_code"], "TSLA");
        assert!(json["updated_at"].is_null());
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_only_author_can_modify() {
        let pool = test_db::connect().await;
        let author = test_db::create_user(&pool).await;
        let other = test_db::create_user(&pool).await;

        let comment = CommentRepository::create(&pool, author.user_id, "TSLA", "실적 기대")
            .await
            .unwrap();
        assert_eq!(comment.user.user_id, author.user_id);
        assert!(comment.updated_at.is_none());

        assert!(CommentRepository::update(&pool, other.user_id, comment.comment_id, "변경")
            .await
            .unwrap()
            .is_none());
        assert!(!CommentRepository::delete(&pool, other.user_id, comment.comment_id)
            .await
            .unwrap());

        let updated = CommentRepository::update(&pool, author.user_id, comment.comment_id, "수정")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "수정");
        assert!(updated.updated_at.is_some());

        assert!(CommentRepository::delete(&pool, author.user_id, comment.comment_id)
            .await
            .unwrap());
        assert!(CommentRepository::find_by_id(&pool, comment.comment_id)
            .await
            .unwrap()
            .is_none());

        test_db::delete_user(&pool, author.user_id).await;
        test_db::delete_user(&pool, other.user_id).await;
    }
}
