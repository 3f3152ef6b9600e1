//! One complete voice turn — the server side of the pipeline.
//!
//! [`VoiceTurnService`] sequences transcription, persistence, reply
//! generation, titling and synthesis for a single uploaded clip.  See
//! [`service`] for the stage ordering and failure semantics.

pub mod service;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use service::{TurnAudio, TurnError, VoiceTurnRequest, VoiceTurnResponse, VoiceTurnService};
