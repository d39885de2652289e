//! # AlphaBot Core
//!
//! 종목 채팅 백엔드와 데이터 수집기가 함께 사용하는 기본 타입을 제공합니다.
//!
//! - 종목 코드 정규화
//! - 채팅방 휴지통 상태 / 메시지 역할
//! - 재무제표 보고 유형
//! - 페이지네이션
//! - 환경 변수 기반 설정 헬퍼
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use logging::*;
