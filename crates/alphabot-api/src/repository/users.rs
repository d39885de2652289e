//! Users Repository
//!
//! 회원 가입/로그인에 필요한 사용자 조회와 생성을 담당합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// 사용자 레코드.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRecord {
    pub user_id: i32,
    pub login_id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_pw: String,
    pub created_at: DateTime<Utc>,
}

/// Users Repository
pub struct UserRepository;

impl UserRepository {
    /// 로그인 ID로 조회
    pub async fn find_by_login_id(
        pool: &PgPool,
        login_id: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, login_id, username, hashed_pw, created_at FROM users WHERE login_id = $1",
        )
        .bind(login_id)
        .fetch_optional(pool)
        .await
    }

    /// 로그인 ID 사용 여부
    pub async fn login_id_exists(pool: &PgPool, login_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE login_id = $1)")
            .bind(login_id)
            .fetch_one(pool)
            .await
    }

    /// 사용자 생성. 로그인 ID 중복이면 unique violation.
    pub async fn create(
        pool: &PgPool,
        login_id: &str,
        username: &str,
        hashed_pw: &str,
    ) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (login_id, username, hashed_pw)
            VALUES ($1, $2, $3)
            RETURNING user_id, login_id, username, hashed_pw, created_at
            "#,
        )
        .bind(login_id)
        .bind(username)
        .bind(hashed_pw)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_unique_violation;
    use crate::repository::test_db;

    #[tokio::test]
    #[ignore] // DB 연결 필요
    async fn test_login_id_is_unique() {
        let pool = test_db::connect().await;
        let user = test_db::create_user(&pool).await;

        assert!(UserRepository::login_id_exists(&pool, &user.login_id).await.unwrap());
        let found = UserRepository::find_by_login_id(&pool, &user.login_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, user.user_id);

        let err = UserRepository::create(&pool, &user.login_id, "again", "hash")
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        test_db::delete_user(&pool, user.user_id).await;
        assert!(!UserRepository::login_id_exists(&pool, &user.login_id).await.unwrap());
    }
}
