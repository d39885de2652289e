//! 인증.
//!
//! - [`Claims`]: JWT 페이로드 (`sub` = 로그인 ID)
//! - [`CurrentUser`]: 보호된 핸들러용 사용자 추출기
//! - Argon2 비밀번호 해싱

mod extractor;
mod jwt;
mod password;

pub use extractor::{bearer_token, CurrentUser, CREDENTIALS_ERROR};
pub use jwt::{create_token, decode_token, issue_access_token, Claims, JwtError};
pub use password::{
    hash_password, hash_password_async, verify_password, verify_password_async, PasswordError,
};
