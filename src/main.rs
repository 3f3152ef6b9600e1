//! Application entry point — TiViVu terminal voice chat.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the provider-facing components: chat backend (one-time
//!    provider selection), transcriber, synthesizer, in-memory store.
//! 4. Open the microphone and start the cpal stream (degrades to a stub
//!    when no device is present).
//! 5. Spawn the [`VoiceSession`] orchestrator on the tokio runtime.
//! 6. Read commands from stdin and translate them into session events
//!    until `quit`.

use std::sync::Arc;

use tokio::sync::mpsc;

use tivivu_voice::audio::{
    AudioCapture, Microphone, Player, RodioPlayer, StreamHandle, UnavailableMicrophone,
};
use tivivu_voice::chat::{build_backend, DialogueAssembler};
use tivivu_voice::config::AppConfig;
use tivivu_voice::session::{new_shared_state, SessionEvent, SessionPhase, VoiceSession};
use tivivu_voice::store::InMemoryStore;
use tivivu_voice::stt::ApiTranscriber;
use tivivu_voice::tts::ApiSynthesizer;
use tivivu_voice::turn::VoiceTurnService;

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("TiViVu voice chat starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Server-side components
    let store = Arc::new(InMemoryStore::new());
    let backend = build_backend(&config.chat);
    let assembler = Arc::new(DialogueAssembler::new(
        backend,
        store.clone(),
        config.chat.clone(),
        config.history.clone(),
    ));
    let turn_service = Arc::new(VoiceTurnService::new(
        Arc::new(ApiTranscriber::from_config(&config.stt)),
        assembler,
        Arc::new(ApiSynthesizer::from_config(&config.tts)),
        store,
    ));

    // 5. Microphone — keep the cpal stream guard on the main thread; fall
    //    back to a stub so the session still runs without a device.
    let mut _stream_guard: Option<StreamHandle> = None;
    let mic: Arc<dyn Microphone> = match AudioCapture::new() {
        Ok(capture) => match capture.start(config.session.max_recording_secs) {
            Ok((shared, guard)) => {
                _stream_guard = Some(guard);
                shared
            }
            Err(e) => {
                log::warn!("Failed to start audio stream: {e}");
                Arc::new(UnavailableMicrophone)
            }
        },
        Err(e) => {
            log::warn!("Audio capture unavailable: {e}");
            Arc::new(UnavailableMicrophone)
        }
    };

    let player: Arc<dyn Player> = Arc::new(RodioPlayer::new());

    // 6. Session orchestrator
    let state = new_shared_state(config.session.hands_free);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);

    let session = VoiceSession::new(
        Arc::clone(&state),
        mic,
        player,
        turn_service,
        config.session.clone(),
        config.stt.language.clone(),
        uuid::Uuid::new_v4(),
        event_tx.clone(),
    );
    let session_task = rt.spawn(session.run(event_rx));

    // 7. stdin command loop
    println!("TiViVu voice chat — commands: record | stop | handsfree on|off | status | quit");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let mut parts = line.split_whitespace();
        let event = match (parts.next(), parts.next()) {
            (Some("record"), _) => Some(SessionEvent::PressRecord),
            (Some("stop"), _) => Some(SessionEvent::PressStop),
            (Some("handsfree"), Some("on")) => Some(SessionEvent::SetHandsFree(true)),
            (Some("handsfree"), Some("off")) => Some(SessionEvent::SetHandsFree(false)),
            (Some("status"), _) => {
                let st = state.lock().unwrap();
                println!("[{}] {}", st.phase.label(), st.status);
                if st.phase == SessionPhase::Error {
                    if let Some(err) = &st.error_message {
                        println!("  last error: {err}");
                    }
                }
                if let Some(t) = &st.last_transcript {
                    println!("  you said: {t}");
                }
                if let Some(r) = &st.last_reply {
                    println!("  reply:    {r}");
                }
                None
            }
            (Some("quit"), _) | (Some("exit"), _) => break,
            (None, _) => None,
            (Some(other), _) => {
                println!("unknown command: {other}");
                None
            }
        };

        if let Some(event) = event {
            if rt.block_on(event_tx.send(event)).is_err() {
                break;
            }
        }
    }

    // Shut the session down and wait for it to release the microphone.
    let _ = rt.block_on(event_tx.send(SessionEvent::Close));
    let _ = rt.block_on(session_task);

    Ok(())
}
