//! TiViVu voice chat — the voice-turn pipeline of a language-learning
//! assistant.
//!
//! One turn flows record → upload → transcribe → converse → synthesize →
//! playback:
//!
//! ```text
//! audio/   Recorder (cpal), SilenceDetector, WAV encode, Player (rodio)
//! stt/     Transcriber — remote audio-transcriptions gateway
//! chat/    DialogueAssembler — history window, providers, titling
//! tts/     Synthesizer — language heuristic, voices, degraded fallback
//! store/   ConversationStore — owner-scoped conversations & messages
//! turn/    VoiceTurnService — one complete server-side turn
//! session/ VoiceSession — the client-side state machine
//! config/  AppConfig — TOML settings for all of the above
//! ```

pub mod audio;
pub mod chat;
pub mod config;
pub mod session;
pub mod store;
pub mod stt;
pub mod tts;
pub mod turn;
