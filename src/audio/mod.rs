//! Audio pipeline — microphone capture → ring buffer → WAV clip, plus
//! silence detection and reply playback.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → SampleBuffer (bounded) ──stop──▶ WAV clip
//!                    │
//!                    └─▶ live RMS level → SilenceDetector → auto-stop
//!
//! reply audio bytes → Player (rodio) → PlaybackFinished
//! ```
//!
//! The cpal stream is created once at startup and stays alive for the whole
//! session; recording is gated by a flag on [`SharedCapture`], so the
//! orchestrator never touches the (non-`Send`) stream object directly.

pub mod buffer;
pub mod capture;
pub mod playback;
pub mod silence;
pub mod wav;

pub use buffer::SampleBuffer;
pub use capture::{
    AudioCapture, CaptureError, Microphone, RecordedClip, SharedCapture, StreamHandle,
    UnavailableMicrophone,
};
pub use playback::{Player, RodioPlayer};
pub use silence::SilenceDetector;
pub use wav::encode_wav_pcm16;
