//! Core [`Transcriber`] trait and the remote-API implementation.
//!
//! `ApiTranscriber` calls any OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint.  All connection details come from
//! [`SttConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SttConfig;

/// Sentinel language hint meaning "let the provider detect the language".
pub const AUTO_LANGUAGE: &str = "auto";

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the transcription gateway.
#[derive(Debug, Error)]
pub enum SttError {
    /// The audio payload was empty.
    #[error("No audio data to transcribe")]
    EmptyAudio,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SttError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SttError::Timeout
        } else {
            SttError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Async, object-safe interface for speech-to-text gateways.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn Transcriber>` and called from any task.
///
/// # Contract
///
/// * `audio` is a complete encoded clip (WAV/WebM/MP3 container bytes).
/// * `language` is an ISO-639-1 hint, or [`AUTO_LANGUAGE`] to leave the
///   detection to the provider.
/// * An empty `audio` buffer yields `Err(SttError::EmptyAudio)`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one clip and return the recognized text.
    async fn transcribe(
        &self,
        audio: &[u8],
        filename: &str,
        language: &str,
    ) -> Result<String, SttError>;
}

// Compile-time assertion: the trait must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// ApiTranscriber
// ---------------------------------------------------------------------------

/// Remote transcription gateway over an OpenAI-compatible audio API.
///
/// Uploads the clip as `multipart/form-data` (`file`, `model`, and
/// `language` unless the hint is [`AUTO_LANGUAGE`]) and reads the `text`
/// field of the JSON response.
pub struct ApiTranscriber {
    client: reqwest::Client,
    config: SttConfig,
}

impl ApiTranscriber {
    /// Build an `ApiTranscriber` from application config.
    pub fn from_config(config: &SttConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn mime_for(filename: &str) -> &'static str {
        match filename.rsplit('.').next() {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl Transcriber for ApiTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        filename: &str,
        language: &str,
    ) -> Result<String, SttError> {
        if audio.is_empty() {
            return Err(SttError::EmptyAudio);
        }

        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string())
            .mime_str(Self::mime_for(filename))
            .map_err(|e| SttError::Request(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());

        // The language field is omitted for the `auto` sentinel so the
        // provider runs its own detection.
        if language != AUTO_LANGUAGE && !language.is_empty() {
            form = form.text("language", language.to_string());
        }

        let mut req = self.client.post(&url).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SttError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SttError::Parse(e.to_string()))?;

        let text = json["text"].as_str().unwrap_or_default().to_string();
        log::debug!("stt: transcribed {} bytes -> {} chars", audio.len(), text.len());
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber (test double)
// ---------------------------------------------------------------------------

/// Test double returning a pre-configured transcript or error.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, String>,
}

#[cfg(test)]
impl MockTranscriber {
    /// Always succeed with `text`.
    pub fn ok(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
        }
    }

    /// Always fail with a provider error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        _filename: &str,
        _language: &str,
    ) -> Result<String, SttError> {
        if audio.is_empty() {
            return Err(SttError::EmptyAudio);
        }
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(SttError::Provider {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
