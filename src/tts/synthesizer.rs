//! Core [`Synthesizer`] trait and the remote-API implementation.
//!
//! `ApiSynthesizer` calls any OpenAI-compatible `/v1/audio/speech`
//! endpoint.  When the capability is disabled in config it returns the
//! degraded [`SynthesisResult::Text`] instead of audio — the caller decides
//! how to present text that could not be voiced.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TtsConfig;
use crate::tts::language::{detect_language, pick_voice, Lang};

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum TtsError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("synthesis request timed out")]
    Timeout,

    /// The provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisRequest / SynthesisResult
// ---------------------------------------------------------------------------

/// One synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to voice.
    pub text: String,
    /// Requested voice name, or [`AUTO_VOICE`] to pick by language.
    pub voice: String,
    /// Output container format (`"mp3"`, `"wav"`, …).
    pub format: String,
    /// Explicit language code, or `"auto"` to run the diacritic heuristic
    /// over `text`.
    pub language: String,
}

/// Outcome of a synthesis call — either real audio or the degraded
/// text-bytes fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisResult {
    /// Binary audio in the requested format.
    Audio {
        bytes: Vec<u8>,
        content_type: String,
    },
    /// The input text as UTF-8 bytes, typed `text/plain` — returned when
    /// the audio capability is unavailable.
    Text { bytes: Vec<u8> },
}

impl SynthesisResult {
    /// Degraded fallback for `text`.
    pub fn degraded(text: &str) -> Self {
        SynthesisResult::Text {
            bytes: text.as_bytes().to_vec(),
        }
    }

    /// Content type of the payload.
    pub fn content_type(&self) -> &str {
        match self {
            SynthesisResult::Audio { content_type, .. } => content_type,
            SynthesisResult::Text { .. } => "text/plain",
        }
    }

    /// Payload bytes, whichever variant.
    pub fn bytes(&self) -> &[u8] {
        match self {
            SynthesisResult::Audio { bytes, .. } => bytes,
            SynthesisResult::Text { bytes } => bytes,
        }
    }

    /// Whether the payload is playable audio.
    pub fn is_audio(&self) -> bool {
        matches!(self, SynthesisResult::Audio { .. })
    }
}

/// Map an output format to its MIME content type.
fn content_type_for(format: &str) -> String {
    if format == "wav" {
        "audio/wav".to_string()
    } else {
        format!("audio/{format}")
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Async, object-safe interface for speech synthesis backends.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Voice `request.text`, resolving language and voice as needed.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, TtsError>;
}

// Compile-time assertion: the trait must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Synthesizer>) {}
};

// ---------------------------------------------------------------------------
// ApiSynthesizer
// ---------------------------------------------------------------------------

/// Remote synthesis over an OpenAI-compatible audio API.
pub struct ApiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ApiSynthesizer {
    /// Build an `ApiSynthesizer` from application config.
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Resolve the voice for `request`: explicit language hint first,
    /// diacritic heuristic otherwise.
    fn resolve_voice(&self, request: &SynthesisRequest) -> String {
        let lang = if request.language.is_empty() || request.language == "auto" {
            detect_language(&request.text)
        } else {
            Lang::from_code(&request.language)
        };
        pick_voice(lang, &request.voice, &self.config)
    }
}

#[async_trait]
impl Synthesizer for ApiSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, TtsError> {
        // Degraded path: the audio capability is not available at all.
        if !self.config.enabled {
            log::warn!("tts: audio capability disabled — returning text bytes");
            return Ok(SynthesisResult::degraded(&request.text));
        }

        let voice = self.resolve_voice(request);
        let format = if request.format.is_empty() {
            self.config.format.clone()
        } else {
            request.format.clone()
        };

        let url = format!("{}/v1/audio/speech", self.config.base_url);
        let body = serde_json::json!({
            "model":           self.config.model,
            "voice":           voice,
            "input":           request.text,
            "response_format": format,
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?.to_vec();
        log::debug!("tts: synthesized {} bytes as {voice}/{format}", bytes.len());

        Ok(SynthesisResult::Audio {
            bytes,
            content_type: content_type_for(&format),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::language::AUTO_VOICE;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice: AUTO_VOICE.to_string(),
            format: "mp3".to_string(),
            language: "auto".to_string(),
        }
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("wav"), "audio/wav");
        assert_eq!(content_type_for("mp3"), "audio/mp3");
        assert_eq!(content_type_for("opus"), "audio/opus");
    }

    #[test]
    fn degraded_result_is_text_plain() {
        let result = SynthesisResult::degraded("xin chào");
        assert_eq!(result.content_type(), "text/plain");
        assert_eq!(result.bytes(), "xin chào".as_bytes());
        assert!(!result.is_audio());
    }

    #[test]
    fn audio_result_reports_audio() {
        let result = SynthesisResult::Audio {
            bytes: vec![0xFF, 0xF3],
            content_type: "audio/mp3".into(),
        };
        assert!(result.is_audio());
        assert_eq!(result.content_type(), "audio/mp3");
    }

    #[tokio::test]
    async fn disabled_capability_degrades_to_text() {
        let config = TtsConfig {
            enabled: false,
            ..TtsConfig::default()
        };
        let synth = ApiSynthesizer::from_config(&config);

        let result = synth.synthesize(&request("hello there")).await.unwrap();

        assert_eq!(result, SynthesisResult::degraded("hello there"));
    }

    #[test]
    fn resolve_voice_prefers_explicit_request() {
        let synth = ApiSynthesizer::from_config(&TtsConfig::default());
        let mut req = request("Chào bạn, bạn khỏe không?");
        req.voice = "onyx".into();
        assert_eq!(synth.resolve_voice(&req), "onyx");
    }

    #[test]
    fn resolve_voice_uses_heuristic_on_auto() {
        let config = TtsConfig {
            voice_en: "alloy".into(),
            voice_vi: "coral".into(),
            ..TtsConfig::default()
        };
        let synth = ApiSynthesizer::from_config(&config);

        assert_eq!(synth.resolve_voice(&request("Plain English text.")), "alloy");
        assert_eq!(
            synth.resolve_voice(&request("Chào bạn, bạn khỏe không?")),
            "coral"
        );
    }

    #[test]
    fn resolve_voice_honours_explicit_language_hint() {
        let config = TtsConfig {
            voice_en: "alloy".into(),
            voice_vi: "coral".into(),
            ..TtsConfig::default()
        };
        let synth = ApiSynthesizer::from_config(&config);

        let mut req = request("no diacritics here at all");
        req.language = "vi".into();
        assert_eq!(synth.resolve_voice(&req), "coral");
    }

    #[test]
    fn synthesizer_is_object_safe() {
        let s: Box<dyn Synthesizer> = Box::new(ApiSynthesizer::from_config(&TtsConfig::default()));
        drop(s);
    }
}
