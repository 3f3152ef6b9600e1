//! Session state machine and shared session state.
//!
//! [`SessionPhase`] drives the orchestrator's state machine; the UI layer
//! reads it via [`SharedSessionState`] to render the record button and
//! status line.
//!
//! [`SharedSessionState`] is a type alias for `Arc<Mutex<SessionState>>` —
//! cheap to clone and safe to share across tasks.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Observable phases of one voice turn.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──record press───▶ Recording
///      ──stop press / silence──▶ Uploading   (server runs the whole turn)
///      ──turn ok, audio──▶ Playing
///      ──playback end──▶ Idle            (manual mode)
///                      ──▶ Recording     (hands-free, after resume delay)
/// any stage failure ──▶ Error ──record press──▶ Recording
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the user to press record.
    Idle,

    /// Microphone armed; samples are accumulating.
    Recording,

    /// Clip uploaded; waiting for the server turn to complete.
    Uploading,

    /// Synthesized reply is playing.
    Playing,

    /// A stage failed; the status line shows why.  The next record press
    /// starts a fresh turn.
    Error,
}

impl SessionPhase {
    /// Returns `true` while a turn is in flight and the record button
    /// should be disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Uploading | SessionPhase::Playing)
    }

    /// Short human-readable label for the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Recording => "Recording",
            SessionPhase::Uploading => "Processing",
            SessionPhase::Playing => "Playing",
            SessionPhase::Error => "Error",
        }
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Shared session state — the single source of truth for the UI layer.
#[derive(Debug)]
pub struct SessionState {
    /// Current phase of the voice turn.
    pub phase: SessionPhase,

    /// User-visible status line ("Tap to record", "Recording…", …).
    pub status: String,

    /// Transcript of the most recent turn.
    pub last_transcript: Option<String>,

    /// Reply text of the most recent turn.
    pub last_reply: Option<String>,

    /// Conversation carried across turns; set by the first successful turn.
    pub conversation_id: Option<Uuid>,

    /// Whether recording restarts automatically after playback.
    pub hands_free: bool,

    /// Failure description when `phase == SessionPhase::Error`.
    pub error_message: Option<String>,
}

impl SessionState {
    pub fn new(hands_free: bool) -> Self {
        Self {
            phase: SessionPhase::Idle,
            status: "Tap to record".into(),
            last_transcript: None,
            last_reply: None,
            conversation_id: None,
            hands_free,
            error_message: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(false)
    }
}

// ---------------------------------------------------------------------------
// SharedSessionState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionState`].
///
/// Lock with `.lock().unwrap()` for a short critical section; do **not**
/// hold the lock across an `.await` point.
pub type SharedSessionState = Arc<Mutex<SessionState>>;

/// Construct a new [`SharedSessionState`].
pub fn new_shared_state(hands_free: bool) -> SharedSessionState {
    Arc::new(Mutex::new(SessionState::new(hands_free)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
