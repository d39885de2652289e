//! 도메인 서비스.

pub mod chat_service;
pub mod openai;

pub use chat_service::{
    build_prompt, create_message_and_reply, generate_reply, ChatExchange, ChatServiceError,
};
pub use openai::{ChatModel, ChatTurn, OpenAiClient, OpenAiConfig, OpenAiError};
