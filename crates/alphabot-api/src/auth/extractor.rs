//! Axum용 인증 사용자 추출기.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::decode_token;
use crate::error::Unauthorized;
use crate::repository::{UserRecord, UserRepository};
use crate::state::AppState;

/// 인증 실패 메시지
pub const CREDENTIALS_ERROR: &str = "Could not validate credentials";

/// 현재 로그인한 사용자.
///
/// `Authorization: Bearer <token>`을 검증하고 `sub`(로그인 ID)로 사용자를 불러옵니다.
///
/// ```rust,ignore
/// async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
///     Json(user.into())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// `Authorization` 헤더에서 Bearer 토큰 추출.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| Unauthorized(CREDENTIALS_ERROR).into_response())?;

        let claims = decode_token(token, &state.auth.secret)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                Unauthorized(CREDENTIALS_ERROR).into_response()
            })?
            .claims;

        let pool = state.pool().map_err(IntoResponse::into_response)?;

        let user = UserRepository::find_by_login_id(pool, &claims.sub)
            .await
            .map_err(|e| crate::error::db_error(e).into_response())?
            .ok_or_else(|| Unauthorized(CREDENTIALS_ERROR).into_response())?;

        Ok(CurrentUser(user))
    }
}
