//! OpenAI Chat Completions 클라이언트.

use std::time::Duration;

use alphabot_core::{env_var_opt, env_var_parse, MessageRole};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5";

/// 대화 한 턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// OpenAI 호출 에러.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid API key header")]
    InvalidApiKey,

    #[error("OpenAI returned empty response")]
    EmptyResponse,
}

/// 어시스턴트 응답 생성기.
///
/// `AppState`가 `Arc<dyn ChatModel>`로 보관하므로 테스트에서 가짜 구현을 주입할 수 있습니다.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 대화 이력으로 다음 어시스턴트 응답을 생성합니다.
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, OpenAiError>;
}

/// OpenAI 설정.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// `OPENAI_API_KEY`가 없으면 None.
    pub fn from_env() -> Option<Self> {
        let api_key = env_var_opt("OPENAI_API_KEY")?;
        let defaults = Self::new(api_key);

        Some(Self {
            base_url: env_var_opt("OPENAI_BASE_URL").unwrap_or(defaults.base_url.clone()),
            model: env_var_opt("OPENAI_MODEL").unwrap_or(defaults.model.clone()),
            temperature: env_var_parse("OPENAI_TEMPERATURE", defaults.temperature),
            max_tokens: env_var_parse("OPENAI_MAX_TOKENS", defaults.max_tokens),
            ..defaults
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI HTTP 클라이언트.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn headers(&self) -> Result<HeaderMap, OpenAiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|_| OpenAiError::InvalidApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// `{base_url}/chat/completions` 호출 후 첫 번째 choice의 내용을 반환합니다.
    pub async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<String, OpenAiError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!(model = %self.config.model, turns = messages.len(), "OpenAI chat request");

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_completion_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OpenAiError::EmptyResponse)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, OpenAiError> {
        self.chat_completion(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::new("sk-test").with_base_url(server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_chat_completion_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-5",
                "max_completion_tokens": 512,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "AAPL 전망?"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"긍정적입니다."}}]}"#)
            .create_async()
            .await;

        let reply = client(&server)
            .chat_completion(&[
                ChatTurn::new(MessageRole::System, "be brief"),
                ChatTurn::new(MessageRole::User, "AAPL 전망?"),
            ])
            .await
            .unwrap();

        assert_eq!(reply, "긍정적입니다.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_completion_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = client(&server)
            .chat_completion(&[ChatTurn::new(MessageRole::User, "hi")])
            .await
            .unwrap_err();

        match err {
            OpenAiError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_completion_empty_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .chat_completion(&[ChatTurn::new(MessageRole::User, "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAiError::EmptyResponse));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .chat_completion(&[ChatTurn::new(MessageRole::User, "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAiError::EmptyResponse));
    }
}
