//! Categories Repository
//!
//! 사용자별 북마크 카테고리. `(user_id, title)`은 유니크입니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

// ================================================================================================
// Types
// ================================================================================================

/// 카테고리 레코드
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryRecord {
    pub category_id: i32,
    pub user_id: i32,
    pub title: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 목록 정렬 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    /// 제목 오름차순
    Title,
    /// 생성일 내림차순
    #[default]
    Newest,
}

impl CategorySort {
    /// `sort_by=title`만 제목 정렬, 나머지는 최신순
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("title") => Self::Title,
            _ => Self::Newest,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            Self::Title => "title ASC, category_id ASC",
            Self::Newest => "created_at DESC, category_id DESC",
        }
    }
}

/// 목록 필터
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    /// 제목 부분 일치 (대소문자 무시)
    pub search: Option<String>,
    pub sort: CategorySort,
}

impl CategoryFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern)
    }
}

/// ILIKE 부분 일치 패턴 (`%`, `_`, `\` 이스케이프)
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const CATEGORY_COLUMNS: &str = "category_id, user_id, title, description, created_at";

// ================================================================================================
// Repository
// ================================================================================================

/// Categories Repository
pub struct CategoryRepository;

impl CategoryRepository {
    /// 카테고리 생성. 같은 제목이 있으면 unique violation.
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        title: &str,
        description: Option<&str>,
    ) -> Result<CategoryRecord, sqlx::Error> {
        sqlx::query_as::<_, CategoryRecord>(&format!(
            r#"
            INSERT INTO category (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    /// 본인 카테고리 조회
    pub async fn find_owned(
        pool: &PgPool,
        user_id: i32,
        category_id: i32,
    ) -> Result<Option<CategoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRecord>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE category_id = $1 AND user_id = $2"
        ))
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 같은 제목의 카테고리 존재 여부 (`exclude_id` 제외)
    pub async fn title_exists(
        pool: &PgPool,
        user_id: i32,
        title: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM category
                WHERE user_id = $1 AND title = $2
                  AND ($3::int IS NULL OR category_id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    /// 목록 조회 (페이지)
    pub async fn list(
        pool: &PgPool,
        user_id: i32,
        filter: &CategoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CategoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRecord>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM category
            WHERE user_id = $1
              AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            filter.sort.order_clause()
        ))
        .bind(user_id)
        .bind(filter.search_pattern())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 목록 전체 개수
    pub async fn count(
        pool: &PgPool,
        user_id: i32,
        filter: &CategoryFilter,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM category
            WHERE user_id = $1
              AND ($2::text IS NULL OR title ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(filter.search_pattern())
        .fetch_one(pool)
        .await
    }

    /// 부분 수정. `description`이 `Some(None)`이면 NULL로 지웁니다.
    pub async fn update(
        pool: &PgPool,
        user_id: i32,
        category_id: i32,
        title: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Option<CategoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRecord>(&format!(
            r#"
            UPDATE category
            SET title = COALESCE($3, title),
                description = CASE WHEN $4 THEN $5 ELSE description END
            WHERE category_id = $1 AND user_id = $2
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(category_id)
        .bind(user_id)
        .bind(title)
        .bind(description.is_some())
        .bind(description.flatten())
        .fetch_optional(pool)
        .await
    }

    /// 삭제. 소속 북마크는 미분류(NULL)가 됩니다.
    pub async fn delete(pool: &PgPool, user_id: i32, category_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM category WHERE category_id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_unique_violation;
    use crate::repository::{test_db, BookmarkRepository, ChatRepository, MessageRepository};
    use alphabot_core::MessageRole;

    #[test]
    fn test_sort_from_param() {
        assert_eq!(CategorySort::from_param(Some("title")), CategorySort::Title);
        assert_eq!(CategorySort::from_param(Some("created_at")), CategorySort::Newest);
        assert_eq!(CategorySort::from_param(None), CategorySort::Newest);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tech"), "%tech%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = CategoryFilter {
            search: Some("   ".to_string()),
            sort: CategorySort::Newest,
        };
        assert!(filter.search_pattern().is_none());
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_title_unique_per_user() {
        let pool = test_db::connect().await;
        let user = test_db::create_user(&pool).await;
        let other = test_db::create_user(&pool).await;

        let tech = CategoryRepository::create(&pool, user.user_id, "Tech", None)
            .await
            .unwrap();
        let err = CategoryRepository::create(&pool, user.user_id, "Tech", Some("dup"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // 다른 사용자는 같은 제목 사용 가능
        CategoryRepository::create(&pool, other.user_id, "Tech", None)
            .await
            .unwrap();

        assert!(CategoryRepository::title_exists(&pool, user.user_id, "Tech", None)
            .await
            .unwrap());
        let excluded = Some(tech.category_id);
        assert!(!CategoryRepository::title_exists(&pool, user.user_id, "Tech", excluded)
            .await
            .unwrap());

        // 다른 사용자의 카테고리는 조회/수정/삭제 불가
        assert!(CategoryRepository::find_owned(&pool, other.user_id, tech.category_id)
            .await
            .unwrap()
            .is_none());
        assert!(CategoryRepository::update(&pool, other.user_id, tech.category_id, Some("x"), None)
            .await
            .unwrap()
            .is_none());
        assert!(!CategoryRepository::delete(&pool, other.user_id, tech.category_id)
            .await
            .unwrap());

        test_db::delete_user(&pool, user.user_id).await;
        test_db::delete_user(&pool, other.user_id).await;
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_update_clears_description() {
        let pool = test_db::connect().await;
        let user = test_db::create_user(&pool).await;

        let category = CategoryRepository::create(&pool, user.user_id, "Macro", Some("금리"))
            .await
            .unwrap();

        let unchanged =
            CategoryRepository::update(&pool, user.user_id, category.category_id, None, None)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(unchanged.description.as_deref(), Some("금리"));

        let cleared =
            CategoryRepository::update(&pool, user.user_id, category.category_id, None, Some(None))
                .await
                .unwrap()
                .unwrap();
        assert_eq!(cleared.title, "Macro");
        assert!(cleared.description.is_none());

        test_db::delete_user(&pool, user.user_id).await;
    }

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_delete_uncategorizes_bookmarks() {
        let pool = test_db::connect().await;
        let user = test_db::create_user(&pool).await;

        let chat = ChatRepository::create(&pool, user.user_id, "room", None)
            .await
            .unwrap();
        let message = MessageRepository::create(
            &pool,
            user.user_id,
            chat.chat_id,
            MessageRole::Assistant,
            "답변",
        )
        .await
        .unwrap();
        let category = CategoryRepository::create(&pool, user.user_id, "Saved", None)
            .await
            .unwrap();
        let bookmark = BookmarkRepository::create(
            &pool,
            user.user_id,
            message.messages_id,
            Some(category.category_id),
        )
        .await
        .unwrap();
        assert_eq!(bookmark.category_id, Some(category.category_id));

        assert!(CategoryRepository::delete(&pool, user.user_id, category.category_id)
            .await
            .unwrap());

        let bookmark = BookmarkRepository::find_owned(&pool, user.user_id, bookmark.bookmark_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bookmark.category_id, None);

        test_db::delete_user(&pool, user.user_id).await;
    }
}
