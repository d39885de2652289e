//! 채팅 도메인 열거형.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 채팅방 휴지통 상태 (`trash_enum`).
///
/// - `Out`: 휴지통 밖, 즉 활성 채팅방
/// - `In`: 휴지통 안 (soft delete)
///
/// 사용자/종목 조합당 `Out` 상태 채팅방은 최대 하나입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx-support",
    sqlx(type_name = "trash_enum", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TrashState {
    In,
    #[default]
    Out,
}

impl TrashState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for TrashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 메시지 작성 주체 (`role_enum`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx-support",
    sqlx(type_name = "role_enum", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Chat Completions API의 role 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
