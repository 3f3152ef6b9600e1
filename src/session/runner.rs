//! Session orchestrator — drives record → upload → turn → playback cycles.
//!
//! [`VoiceSession`] owns the [`SharedSessionState`] and responds to
//! [`SessionEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Event flow
//!
//! ```text
//! SessionEvent::PressRecord
//!   └─▶ stop + release playback, arm microphone     [Recording]
//!       (hands-free: spawn silence watcher)
//!
//! SessionEvent::PressStop / SilenceDetected
//!   └─▶ finalize clip, abort watcher                [Uploading]
//!         └─▶ run the voice turn (server side)
//!               ├─ Ok, audio/* payload → play       [Playing]
//!               ├─ Ok, text payload    → display, no playback
//!               └─ Err → status message             [Error]
//!
//! SessionEvent::PlaybackFinished
//!   ├─ manual mode     → [Idle]
//!   └─ hands-free mode → resume delay, then auto PressRecord
//! ```
//!
//! The session keeps a sender clone for its watcher and playback callbacks,
//! so the event channel never closes on its own — shut the session down
//! with [`SessionEvent::Close`].  Every exit path releases the microphone
//! and the playback sink; cancelling a turn stops later stages but never
//! deletes messages the server already persisted.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::audio::{Microphone, Player, SilenceDetector};
use crate::config::SessionConfig;
use crate::session::state::{SessionPhase, SharedSessionState};
use crate::turn::{TurnError, VoiceTurnRequest, VoiceTurnResponse, VoiceTurnService};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Inputs to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// User pressed record (or the hands-free loop re-armed it).
    PressRecord,
    /// User pressed stop.
    PressStop,
    /// The silence watcher detected the end of the utterance.
    SilenceDetected,
    /// The reply clip finished playing.
    PlaybackFinished,
    /// Toggle hands-free looping.
    SetHandsFree(bool),
    /// Shut the session down.
    Close,
}

// ---------------------------------------------------------------------------
// TurnRunner
// ---------------------------------------------------------------------------

/// The session's view of the server: one call per complete voice turn.
///
/// [`VoiceTurnService`] implements it directly for in-process use; an HTTP
/// client can implement it for a remote deployment without the session
/// changing.
#[async_trait]
pub trait TurnRunner: Send + Sync {
    async fn run_turn(&self, request: VoiceTurnRequest) -> Result<VoiceTurnResponse, TurnError>;
}

#[async_trait]
impl TurnRunner for VoiceTurnService {
    async fn run_turn(&self, request: VoiceTurnRequest) -> Result<VoiceTurnResponse, TurnError> {
        self.run(request).await
    }
}

// ---------------------------------------------------------------------------
// VoiceSession
// ---------------------------------------------------------------------------

/// Drives the complete client-side voice loop.
///
/// Create with [`VoiceSession::new`], then call [`run`](Self::run) inside a
/// tokio task and feed it [`SessionEvent`]s.
pub struct VoiceSession {
    state: SharedSessionState,
    mic: Arc<dyn Microphone>,
    player: Arc<dyn Player>,
    turn: Arc<dyn TurnRunner>,
    config: SessionConfig,
    /// Language hint forwarded to every turn (`"auto"` by default).
    language: String,
    user_id: Uuid,
    /// Sender clone used by the silence watcher and playback callbacks.
    event_tx: mpsc::Sender<SessionEvent>,
    watcher: Option<JoinHandle<()>>,
}

impl VoiceSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: SharedSessionState,
        mic: Arc<dyn Microphone>,
        player: Arc<dyn Player>,
        turn: Arc<dyn TurnRunner>,
        config: SessionConfig,
        language: String,
        user_id: Uuid,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            state,
            mic,
            player,
            turn,
            config,
            language,
            user_id,
            event_tx,
            watcher: None,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the session until [`SessionEvent::Close`] arrives.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::PressRecord => self.start_recording(),
                SessionEvent::PressStop | SessionEvent::SilenceDetected => {
                    self.finish_recording().await;
                }
                SessionEvent::PlaybackFinished => self.playback_finished(),
                SessionEvent::SetHandsFree(enabled) => self.set_hands_free(enabled),
                SessionEvent::Close => break,
            }
        }

        self.shutdown();
        log::info!("session: closed");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// `Idle`/`Error` → `Recording`: release old playback, arm the mic.
    fn start_recording(&mut self) {
        {
            let st = self.state.lock().unwrap();
            if !matches!(st.phase, SessionPhase::Idle | SessionPhase::Error) {
                log::debug!("session: record press ignored in {:?}", st.phase);
                return;
            }
        }

        // The previous reply must be silent and released before the mic
        // opens, so its tail never lands in the new clip.
        self.player.stop();

        if let Err(e) = self.mic.start() {
            log::warn!("session: microphone unavailable: {e}");
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Idle;
            st.status = "Microphone unavailable".into();
            st.error_message = Some(e.to_string());
            return;
        }

        let hands_free = {
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Recording;
            st.status = "Recording... tap to stop".into();
            st.error_message = None;
            st.hands_free
        };

        if hands_free {
            self.spawn_silence_watcher();
        }
    }

    /// `Recording` → `Uploading` → (`Playing` | `Idle` | `Error`).
    async fn finish_recording(&mut self) {
        {
            let st = self.state.lock().unwrap();
            if st.phase != SessionPhase::Recording {
                log::debug!("session: stop ignored in {:?}", st.phase);
                return;
            }
        }

        self.stop_watcher();

        let clip = match self.mic.stop() {
            Ok(clip) => clip,
            Err(e) => {
                self.enter_error(format!("recording failed: {e}"));
                return;
            }
        };

        if clip.is_empty() {
            self.enter_error("No audio captured — try again".into());
            return;
        }

        let conversation_id = {
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Uploading;
            st.status = "Processing...".into();
            st.conversation_id
        };

        let request = VoiceTurnRequest {
            user_id: self.user_id,
            audio_base64: BASE64.encode(&clip.bytes),
            filename: clip.filename.into(),
            language: self.language.clone(),
            voice: "auto".into(),
            format: String::new(),
            conversation_id,
            skip_tts: false,
        };

        let response = match self.turn.run_turn(request).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("session: turn failed: {e}");
                self.enter_error(e.to_string());
                return;
            }
        };

        {
            let mut st = self.state.lock().unwrap();
            st.last_transcript = Some(response.transcript.clone());
            st.last_reply = Some(response.reply_text.clone());
            st.conversation_id = Some(response.conversation_id);
        }

        match response.audio {
            Some(audio) if audio.content_type.starts_with("audio/") => {
                match BASE64.decode(&audio.audio_base64) {
                    Ok(bytes) => self.start_playback(bytes),
                    Err(e) => {
                        log::warn!("session: undecodable reply audio: {e}");
                        self.after_playback();
                    }
                }
            }
            // Degraded text payload (or skipped synthesis): show the reply,
            // never hand it to the player.
            _ => self.after_playback(),
        }
    }

    /// `Playing` → `Idle` (manual) or delayed re-record (hands-free).
    fn playback_finished(&mut self) {
        {
            let st = self.state.lock().unwrap();
            if st.phase != SessionPhase::Playing {
                return;
            }
        }
        self.after_playback();
    }

    fn set_hands_free(&mut self, enabled: bool) {
        let recording = {
            let mut st = self.state.lock().unwrap();
            st.hands_free = enabled;
            st.phase == SessionPhase::Recording
        };

        if recording {
            if enabled && self.watcher.is_none() {
                self.spawn_silence_watcher();
            } else if !enabled {
                self.stop_watcher();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn start_playback(&mut self, bytes: Vec<u8>) {
        {
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Playing;
            st.status = "Playing reply...".into();
        }

        let tx = self.event_tx.clone();
        self.player.play(
            bytes,
            Box::new(move || {
                let _ = tx.try_send(SessionEvent::PlaybackFinished);
            }),
        );
    }

    /// Shared tail of the playback / degraded-text paths.
    fn after_playback(&mut self) {
        let hands_free = {
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Idle;
            st.hands_free
        };

        if hands_free {
            self.state.lock().unwrap().status = "Auto recording...".into();
            // Wait out the configured delay off the event loop, then re-arm.
            let tx = self.event_tx.clone();
            let delay = std::time::Duration::from_millis(self.config.resume_delay_ms);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(SessionEvent::PressRecord).await;
            });
        } else {
            self.state.lock().unwrap().status = "Tap to record".into();
        }
    }

    fn enter_error(&mut self, message: String) {
        log::error!("session error: {message}");
        let mut st = self.state.lock().unwrap();
        st.phase = SessionPhase::Error;
        st.status = "Failed. Try again".into();
        st.error_message = Some(message);
    }

    /// Sample the live mic level every detector window; fire
    /// [`SessionEvent::SilenceDetected`] when the utterance has ended.
    fn spawn_silence_watcher(&mut self) {
        self.stop_watcher();

        let mic = Arc::clone(&self.mic);
        let tx = self.event_tx.clone();
        let mut detector = SilenceDetector::from_config(&self.config);

        self.watcher = Some(tokio::spawn(async move {
            let window = detector.window();
            loop {
                tokio::time::sleep(window).await;
                if !mic.is_recording() {
                    break;
                }
                if detector.observe(mic.level()) {
                    log::debug!("session: silence detected");
                    let _ = tx.send(SessionEvent::SilenceDetected).await;
                    break;
                }
            }
        }));
    }

    /// Tear the watcher down so no timer outlives the recording.
    fn stop_watcher(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
    }

    /// Release everything on the way out, whatever state we were in.
    fn shutdown(&mut self) {
        self.stop_watcher();
        if self.mic.is_recording() {
            let _ = self.mic.stop();
        }
        self.player.stop();

        let mut st = self.state.lock().unwrap();
        st.phase = SessionPhase::Idle;
        st.status = "Session closed".into();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
