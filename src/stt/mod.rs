//! STT (Speech-to-Text) — the transcription gateway.
//!
//! [`Transcriber`] is the async interface used by the turn service;
//! [`ApiTranscriber`] is the production implementation that uploads the
//! recorded clip to an OpenAI-compatible audio-transcriptions endpoint.
//!
//! Transcription failure is fatal for the turn: the pipeline aborts rather
//! than fabricating a transcript.

pub mod transcriber;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use transcriber::{ApiTranscriber, SttError, Transcriber, AUTO_LANGUAGE};

#[cfg(test)]
pub use transcriber::MockTranscriber;
