//! TTS (Text-to-Speech) — the speech synthesizer.
//!
//! This module provides:
//! * [`Synthesizer`] — async trait implemented by synthesis backends.
//! * [`ApiSynthesizer`] — OpenAI-compatible `/v1/audio/speech` backend.
//! * [`SynthesisResult`] — tagged audio-or-degraded-text outcome.
//! * [`detect_language`] / [`pick_voice`] — the diacritic heuristic and
//!   language → voice mapping.
//!
//! When the provider's audio capability is unavailable the synthesizer
//! degrades to returning the reply text as `text/plain` bytes; callers must
//! handle that case instead of assuming binary audio.

pub mod language;
pub mod synthesizer;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use language::{detect_language, pick_voice, Lang, AUTO_VOICE};
pub use synthesizer::{ApiSynthesizer, SynthesisRequest, SynthesisResult, Synthesizer, TtsError};
