//! Chat-completion backends: the [`ChatBackend`] trait and one
//! implementation per provider.
//!
//! The provider is selected once at startup via [`build_backend`]; the
//! assembler holds an `Arc<dyn ChatBackend>` and never branches on the
//! provider kind.  Both backends speak the OpenAI chat-completions wire
//! format and differ only in URL path and extra headers.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ChatConfig, ChatProviderKind};

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

/// Errors that can occur during a completion call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// The provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// The model returned a response with no usable text content.
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ChatMessage / CompletionParams
// ---------------------------------------------------------------------------

/// One message of a chat-completions payload.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Per-call sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    /// `None` lets the provider pick its own limit.
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// ChatBackend trait
// ---------------------------------------------------------------------------

/// Async trait for chat-completion providers.
///
/// Implementors must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn ChatBackend>` across the assembler and the turn service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Request one completion for `messages` and return the raw (untrimmed)
    /// text content of the first choice.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ChatError>;
}

// Compile-time assertion: the trait must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ChatBackend>) {}
};

// ---------------------------------------------------------------------------
// Shared request plumbing
// ---------------------------------------------------------------------------

fn messages_json(messages: &[ChatMessage]) -> serde_json::Value {
    serde_json::Value::Array(
        messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect(),
    )
}

async fn send_completion(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    extra_headers: &[(&'static str, String)],
    body: serde_json::Value,
) -> Result<String, ChatError> {
    let mut req = client.post(url).json(&body);

    // Attach Authorization header only when api_key is a non-empty string.
    let key = api_key.unwrap_or("");
    if !key.is_empty() {
        req = req.bearer_auth(key);
    }
    for (name, value) in extra_headers {
        req = req.header(*name, value.as_str());
    }

    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ChatError::Provider {
            status: status.as_u16(),
            message,
        });
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ChatError::Parse(e.to_string()))?;

    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ChatError::EmptyResponse)?
        .to_string();

    if text.trim().is_empty() {
        return Err(ChatError::EmptyResponse);
    }

    Ok(text)
}

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ---------------------------------------------------------------------------
// OpenAiBackend
// ---------------------------------------------------------------------------

/// Direct OpenAI-style backend — `POST {base_url}/v1/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: ChatConfig,
}

impl OpenAiBackend {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ChatError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let mut body = serde_json::json!({
            "model":       self.config.model,
            "messages":    messages_json(messages),
            "temperature": params.temperature,
        });
        if let Some(max) = params.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }

        send_completion(
            &self.client,
            &url,
            self.config.api_key.as_deref(),
            &[],
            body,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// OpenRouterBackend
// ---------------------------------------------------------------------------

/// OpenRouter aggregator backend — `POST {base_url}/api/v1/chat/completions`
/// with the provider-recommended `HTTP-Referer` / `X-Title` headers when
/// configured.
pub struct OpenRouterBackend {
    client: reqwest::Client,
    config: ChatConfig,
}

impl OpenRouterBackend {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn extra_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(referer) = &self.config.referer {
            headers.push(("HTTP-Referer", referer.clone()));
        }
        if let Some(title) = &self.config.app_title {
            headers.push(("X-Title", title.clone()));
        }
        headers
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ChatError> {
        let url = format!("{}/api/v1/chat/completions", self.config.base_url);

        let mut body = serde_json::json!({
            "model":       self.config.model,
            "messages":    messages_json(messages),
            "temperature": params.temperature,
        });
        if let Some(max) = params.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }

        send_completion(
            &self.client,
            &url,
            self.config.api_key.as_deref(),
            &self.extra_headers(),
            body,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// build_backend
// ---------------------------------------------------------------------------

/// One-time provider selection from configuration.
///
/// Called once at startup; everything downstream is polymorphic over
/// `Arc<dyn ChatBackend>`.
pub fn build_backend(config: &ChatConfig) -> std::sync::Arc<dyn ChatBackend> {
    match config.provider {
        ChatProviderKind::OpenAi => std::sync::Arc::new(OpenAiBackend::from_config(config)),
        ChatProviderKind::OpenRouter => {
            std::sync::Arc::new(OpenRouterBackend::from_config(config))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(provider: ChatProviderKind) -> ChatConfig {
        ChatConfig {
            provider,
            ..ChatConfig::default()
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _ = OpenAiBackend::from_config(&make_config(ChatProviderKind::OpenAi));
        let _ = OpenRouterBackend::from_config(&make_config(ChatProviderKind::OpenRouter));
    }

    #[test]
    fn build_backend_selects_by_kind() {
        // Just verify both arms construct a usable trait object.
        let _: std::sync::Arc<dyn ChatBackend> =
            build_backend(&make_config(ChatProviderKind::OpenAi));
        let _: std::sync::Arc<dyn ChatBackend> =
            build_backend(&make_config(ChatProviderKind::OpenRouter));
    }

    #[test]
    fn openrouter_headers_follow_config() {
        let mut config = make_config(ChatProviderKind::OpenRouter);
        config.referer = Some("https://tivivu.example".into());
        config.app_title = Some("TiViVu".into());

        let backend = OpenRouterBackend::from_config(&config);
        let headers = backend.extra_headers();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "HTTP-Referer");
        assert_eq!(headers[1].0, "X-Title");
    }

    #[test]
    fn openrouter_headers_empty_by_default() {
        let backend = OpenRouterBackend::from_config(&make_config(ChatProviderKind::OpenRouter));
        assert!(backend.extra_headers().is_empty());
    }

    #[test]
    fn messages_json_preserves_order_and_roles() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ];

        let json = messages_json(&messages);
        let arr = json.as_array().unwrap();

        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0]["role"], "system");
        assert_eq!(arr[1]["content"], "hello");
        assert_eq!(arr[2]["role"], "assistant");
    }
}
