//! Reply playback through `rodio`.
//!
//! [`Player`] is the small interface the session orchestrator drives; the
//! production [`RodioPlayer`] decodes the synthesized clip (MP3/WAV) on a
//! dedicated thread, because `rodio::OutputStream` is not `Send`.
//!
//! `stop` halts and releases the current sink without invoking the
//! completion callback — the orchestrator calls it before starting a new
//! recording so the tail of the reply never leaks into the next clip.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Player trait
// ---------------------------------------------------------------------------

/// Playback control used by the session orchestrator.
///
/// `on_done` runs exactly once when the clip drains naturally or fails to
/// play; it is **not** invoked after an explicit [`stop`](Player::stop).
pub trait Player: Send + Sync {
    /// Start playing `bytes`, releasing any previous playback first.
    fn play(&self, bytes: Vec<u8>, on_done: Box<dyn FnOnce() + Send>);

    /// Stop and release the current playback, if any.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// RodioPlayer
// ---------------------------------------------------------------------------

/// Decodes and plays clips on a background thread.
pub struct RodioPlayer {
    current: Arc<Mutex<Option<rodio::Sink>>>,
    cancelled: Arc<AtomicBool>,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for RodioPlayer {
    fn play(&self, bytes: Vec<u8>, on_done: Box<dyn FnOnce() + Send>) {
        self.stop();
        self.cancelled.store(false, Ordering::Relaxed);

        let current = Arc::clone(&self.current);
        let cancelled = Arc::clone(&self.cancelled);

        let spawned = std::thread::Builder::new()
            .name("reply-playback".into())
            .spawn(move || {
                // The output stream must live on this thread for the whole
                // clip; the sink is parked in `current` so stop() can reach it.
                let (_stream, handle) = match rodio::OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::warn!("playback: no output device: {e}");
                        on_done();
                        return;
                    }
                };

                let sink = match rodio::Sink::try_new(&handle) {
                    Ok(s) => s,
                    Err(e) => {
                        log::warn!("playback: failed to open sink: {e}");
                        on_done();
                        return;
                    }
                };

                match rodio::Decoder::new(Cursor::new(bytes)) {
                    Ok(source) => sink.append(source),
                    Err(e) => {
                        log::warn!("playback: undecodable clip: {e}");
                        on_done();
                        return;
                    }
                }

                *current.lock().unwrap() = Some(sink);

                // Poll until the clip drains or stop() takes the sink away.
                loop {
                    let finished = match current.lock().unwrap().as_ref() {
                        Some(sink) => sink.empty(),
                        None => break, // stopped externally
                    };
                    if finished {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }

                current.lock().unwrap().take();

                if !cancelled.load(Ordering::Relaxed) {
                    on_done();
                }
            });

        if let Err(e) = spawned {
            log::error!("playback: failed to spawn thread: {e}");
        }
    }

    fn stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(sink) = self.current.lock().unwrap().take() {
            sink.stop();
            log::debug!("playback: stopped and released sink");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
