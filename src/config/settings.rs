//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ChatProviderKind
// ---------------------------------------------------------------------------

/// Selects which backend the dialogue assembler talks to.
///
/// The selection happens once at startup — see
/// [`crate::chat::build_backend`] — the assembler itself is polymorphic over
/// the backend and never branches on the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChatProviderKind {
    /// Direct OpenAI-style API (`/v1/chat/completions`).
    OpenAi,
    /// OpenRouter aggregator API (`/api/v1/chat/completions`).
    OpenRouter,
}

impl Default for ChatProviderKind {
    fn default() -> Self {
        Self::OpenAi
    }
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Settings for the reply-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Which backend to use.
    pub provider: ChatProviderKind,
    /// Base URL of the API endpoint.
    ///
    /// - OpenAI default: `https://api.openai.com`
    /// - OpenRouter: `https://openrouter.ai`
    pub base_url: String,
    /// API key — `None` for keyless local gateways.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"gpt-4o-mini"`,
    /// `"openai/gpt-4o-mini"` for OpenRouter).
    pub model: String,
    /// Sampling temperature for replies.
    pub temperature: f32,
    /// Sampling temperature for title generation (lower = more stable).
    pub title_temperature: f32,
    /// Optional hard cap on reply tokens; `None` lets the provider decide.
    pub max_tokens: Option<u32>,
    /// Token cap for title generation.
    pub title_max_tokens: u32,
    /// Maximum seconds to wait for a completion before timing out.
    pub timeout_secs: u64,
    /// `HTTP-Referer` header for OpenRouter requests (recommended by the
    /// provider, ignored by the OpenAI backend).
    pub referer: Option<String>,
    /// `X-Title` header for OpenRouter requests.
    pub app_title: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatProviderKind::default(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            title_temperature: 0.2,
            max_tokens: None,
            title_max_tokens: 64,
            timeout_secs: 30,
            referer: None,
            app_title: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the remote transcription gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Base URL of the audio API endpoint.
    pub base_url: String,
    /// API key — `None` for keyless local gateways.
    pub api_key: Option<String>,
    /// Transcription model identifier.
    pub model: String,
    /// Language hint as an ISO-639-1 code, or `"auto"` to let the provider
    /// detect the language.
    pub language: String,
    /// Maximum seconds to wait for a transcription before timing out.
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini-transcribe".into(),
            language: "auto".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for speech synthesis and voice selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Whether the provider's audio capability is available.  When `false`
    /// the synthesizer degrades to returning the reply text as
    /// `text/plain` bytes instead of audio.
    pub enabled: bool,
    /// Base URL of the audio API endpoint.
    pub base_url: String,
    /// API key — `None` for keyless local gateways.
    pub api_key: Option<String>,
    /// Synthesis model identifier.
    pub model: String,
    /// Voice used for English replies.
    pub voice_en: String,
    /// Voice used for Vietnamese replies.
    pub voice_vi: String,
    /// Fallback voice when no language-specific voice applies.
    pub default_voice: String,
    /// Output container format (`"mp3"`, `"wav"`, …).
    pub format: String,
    /// Maximum seconds to wait for synthesis before timing out.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini-tts".into(),
            voice_en: "alloy".into(),
            voice_vi: "alloy".into(),
            default_voice: "alloy".into(),
            format: "mp3".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

/// History-window caps used by the dialogue assembler.
///
/// The caps bound token usage: the full message list is retrieved
/// chronologically and only the most recent N rows are sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Window size for reply generation.
    pub reply_limit: usize,
    /// Window size for title generation.
    pub title_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            reply_limit: 12,
            title_limit: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings for the client-side voice session (recording, silence
/// detection, hands-free looping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Restart recording automatically after playback ends.
    pub hands_free: bool,
    /// RMS amplitude below which a window counts as silence.
    pub silence_threshold: f32,
    /// Sampling window for the silence watcher, in milliseconds.
    pub silence_window_ms: u64,
    /// Continuous sub-threshold time that triggers an automatic stop,
    /// in milliseconds.
    pub silence_duration_ms: u64,
    /// Delay between playback end and the next hands-free recording,
    /// in milliseconds.  Keeps the tail of the played reply out of the
    /// next clip.
    pub resume_delay_ms: u64,
    /// Maximum recording length in seconds; the capture buffer is bounded
    /// to this duration.
    pub max_recording_secs: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hands_free: false,
            silence_threshold: 0.01,
            silence_window_ms: 200,
            silence_duration_ms: 2000,
            resume_delay_ms: 700,
            max_recording_secs: 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use tivivu_voice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reply-generation backend settings.
    pub chat: ChatConfig,
    /// Transcription gateway settings.
    pub stt: SttConfig,
    /// Speech synthesis settings.
    pub tts: TtsConfig,
    /// History-window caps.
    pub history: HistoryConfig,
    /// Client session behaviour.
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // ChatConfig
        assert_eq!(original.chat.provider, loaded.chat.provider);
        assert_eq!(original.chat.base_url, loaded.chat.base_url);
        assert_eq!(original.chat.api_key, loaded.chat.api_key);
        assert_eq!(original.chat.model, loaded.chat.model);
        assert_eq!(original.chat.timeout_secs, loaded.chat.timeout_secs);
        assert_eq!(original.chat.title_max_tokens, loaded.chat.title_max_tokens);

        // SttConfig
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.stt.language, loaded.stt.language);

        // TtsConfig
        assert_eq!(original.tts.enabled, loaded.tts.enabled);
        assert_eq!(original.tts.voice_en, loaded.tts.voice_en);
        assert_eq!(original.tts.voice_vi, loaded.tts.voice_vi);
        assert_eq!(original.tts.format, loaded.tts.format);

        // HistoryConfig
        assert_eq!(original.history.reply_limit, loaded.history.reply_limit);
        assert_eq!(original.history.title_limit, loaded.history.title_limit);

        // SessionConfig
        assert_eq!(original.session.hands_free, loaded.session.hands_free);
        assert_eq!(
            original.session.silence_duration_ms,
            loaded.session.silence_duration_ms
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.chat.model, default.chat.model);
        assert_eq!(config.stt.language, default.stt.language);
        assert_eq!(config.history.reply_limit, default.history.reply_limit);
    }

    /// Verify default values match the design.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.chat.provider, ChatProviderKind::OpenAi);
        assert_eq!(cfg.chat.base_url, "https://api.openai.com");
        assert_eq!(cfg.chat.model, "gpt-4o-mini");
        assert!(cfg.chat.api_key.is_none());
        assert_eq!(cfg.stt.model, "gpt-4o-mini-transcribe");
        assert_eq!(cfg.stt.language, "auto");
        assert_eq!(cfg.tts.model, "gpt-4o-mini-tts");
        assert_eq!(cfg.tts.default_voice, "alloy");
        assert_eq!(cfg.history.reply_limit, 12);
        assert_eq!(cfg.history.title_limit, 8);
        assert_eq!(cfg.session.silence_duration_ms, 2000);
        assert_eq!(cfg.session.silence_window_ms, 200);
        assert!(!cfg.session.hands_free);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.chat.provider = ChatProviderKind::OpenRouter;
        cfg.chat.base_url = "https://openrouter.ai".into();
        cfg.chat.api_key = Some("sk-or-test".into());
        cfg.chat.model = "openai/gpt-4o-mini".into();
        cfg.chat.referer = Some("https://tivivu.example".into());
        cfg.stt.language = "en".into();
        cfg.tts.enabled = false;
        cfg.tts.voice_vi = "coral".into();
        cfg.session.hands_free = true;
        cfg.session.resume_delay_ms = 900;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.chat.provider, ChatProviderKind::OpenRouter);
        assert_eq!(loaded.chat.base_url, "https://openrouter.ai");
        assert_eq!(loaded.chat.api_key, Some("sk-or-test".into()));
        assert_eq!(loaded.chat.referer, Some("https://tivivu.example".into()));
        assert_eq!(loaded.stt.language, "en");
        assert!(!loaded.tts.enabled);
        assert_eq!(loaded.tts.voice_vi, "coral");
        assert!(loaded.session.hands_free);
        assert_eq!(loaded.session.resume_delay_ms, 900);
    }
}
