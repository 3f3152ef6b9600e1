//! Microphone capture via `cpal`.
//!
//! The cpal stream is created once by [`AudioCapture::start`] and kept alive
//! by the returned [`StreamHandle`] (a RAII guard — dropping it stops the
//! hardware stream).  The stream callback writes into a [`SharedCapture`],
//! which is the `Send + Sync` handle the session orchestrator records
//! through: it gates sample accumulation with an atomic flag and publishes a
//! live RMS level for the silence watcher.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::buffer::SampleBuffer;
use crate::audio::wav::encode_wav_pcm16;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or using the microphone.
///
/// Any of these surface to the user as the microphone being unavailable;
/// the session stays idle with a status message.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("no recording in progress")]
    NotRecording,
}

// ---------------------------------------------------------------------------
// RecordedClip
// ---------------------------------------------------------------------------

/// One finalized recording, ready for upload.
#[derive(Debug, Clone)]
pub struct RecordedClip {
    /// Complete WAV container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Suggested upload filename.
    pub filename: &'static str,
    /// Clip length in seconds.
    pub duration_secs: f32,
}

impl RecordedClip {
    pub fn is_empty(&self) -> bool {
        self.duration_secs == 0.0
    }
}

// ---------------------------------------------------------------------------
// Microphone trait
// ---------------------------------------------------------------------------

/// Recording control used by the session orchestrator.
///
/// `start` arms capture, `stop` yields the finalized clip, and `level` is
/// the short-time RMS of the most recent callback buffer (for the silence
/// watcher).  All methods take `&self` so implementations can be shared
/// behind an `Arc` with the watcher task.
pub trait Microphone: Send + Sync {
    /// Begin accumulating samples.  Clears any leftover audio first.
    fn start(&self) -> Result<(), CaptureError>;

    /// Stop accumulating and return the finalized clip.
    fn stop(&self) -> Result<RecordedClip, CaptureError>;

    /// Short-time RMS amplitude of the live input, `0.0` when idle.
    fn level(&self) -> f32;

    /// Whether capture is currently armed.
    fn is_recording(&self) -> bool;
}

// ---------------------------------------------------------------------------
// SharedCapture
// ---------------------------------------------------------------------------

/// `Send + Sync` recording handle backed by the cpal callback.
///
/// The callback pushes samples and the live level regardless of which
/// thread owns the stream; [`Microphone::start`]/[`Microphone::stop`] only
/// flip the gate and drain the buffer.
pub struct SharedCapture {
    buffer: Mutex<SampleBuffer>,
    recording: AtomicBool,
    /// Live RMS level, stored as f32 bits.
    level_bits: AtomicU32,
    sample_rate: u32,
    channels: u16,
}

impl SharedCapture {
    fn new(sample_rate: u32, channels: u16, max_recording_secs: f32) -> Self {
        let capacity =
            (sample_rate as f32 * f32::from(channels) * max_recording_secs).max(1.0) as usize;
        Self {
            buffer: Mutex::new(SampleBuffer::new(capacity)),
            recording: AtomicBool::new(false),
            level_bits: AtomicU32::new(0),
            sample_rate,
            channels,
        }
    }

    /// Called from the cpal callback with one interleaved f32 buffer.
    fn ingest(&self, data: &[f32]) {
        let mean_sq: f32 = data.iter().map(|s| s * s).sum::<f32>() / data.len().max(1) as f32;
        self.level_bits
            .store(mean_sq.sqrt().to_bits(), Ordering::Relaxed);

        if self.recording.load(Ordering::Relaxed) {
            self.buffer.lock().unwrap().push_slice(data);
        }
    }

    /// Average interleaved channels down to mono.
    fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
        if channels <= 1 {
            return samples.to_vec();
        }
        let ch = channels as usize;
        samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

impl Microphone for SharedCapture {
    fn start(&self) -> Result<(), CaptureError> {
        self.buffer.lock().unwrap().clear();
        self.recording.store(true, Ordering::Relaxed);
        log::debug!("capture: recording armed");
        Ok(())
    }

    fn stop(&self) -> Result<RecordedClip, CaptureError> {
        if !self.recording.swap(false, Ordering::Relaxed) {
            return Err(CaptureError::NotRecording);
        }

        let samples = self.buffer.lock().unwrap().drain();
        let mono = Self::downmix(&samples, self.channels);
        let duration_secs = mono.len() as f32 / self.sample_rate as f32;
        let bytes = encode_wav_pcm16(&mono, self.sample_rate, 1);

        log::debug!("capture: finalized {duration_secs:.2}s clip ({} bytes)", bytes.len());

        Ok(RecordedClip {
            bytes,
            mime: "audio/wav",
            filename: "clip.wav",
            duration_secs,
        })
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// UnavailableMicrophone
// ---------------------------------------------------------------------------

/// Stand-in used when no input device could be opened at startup.  Every
/// `start` fails, so the session shows a microphone status message instead
/// of crashing.
pub struct UnavailableMicrophone;

impl Microphone for UnavailableMicrophone {
    fn start(&self) -> Result<(), CaptureError> {
        Err(CaptureError::NoDevice)
    }

    fn stop(&self) -> Result<RecordedClip, CaptureError> {
        Err(CaptureError::NotRecording)
    }

    fn level(&self) -> f32 {
        0.0
    }

    fn is_recording(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream — hold it for
/// the lifetime of the session.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Default-input-device wrapper that wires the cpal callback to a
/// [`SharedCapture`].
///
/// # Example
///
/// ```rust,no_run
/// use tivivu_voice::audio::AudioCapture;
///
/// let capture = AudioCapture::new().unwrap();
/// let (mic, _handle) = capture.start(60.0).unwrap();
/// // `mic` is the Send+Sync recording handle; `_handle` keeps the stream alive.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open the system default input device with its preferred stream
    /// configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;

        Ok(Self {
            device,
            config: supported.into(),
            sample_format,
            sample_rate,
            channels,
        })
    }

    /// Native sample rate reported by the device (Hz).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels reported by the device.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Build and start the input stream.
    ///
    /// Returns the shared recording handle and the RAII stream guard.  The
    /// guard is **not** `Send`; keep it on the thread that called `start`.
    pub fn start(
        &self,
        max_recording_secs: f32,
    ) -> Result<(Arc<SharedCapture>, StreamHandle), CaptureError> {
        let shared = Arc::new(SharedCapture::new(
            self.sample_rate,
            self.channels,
            max_recording_secs,
        ));

        let err_fn = |e| log::error!("capture: stream error: {e}");

        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => {
                let sink = Arc::clone(&shared);
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[f32], _| sink.ingest(data),
                    err_fn,
                    None,
                )?
            }
            cpal::SampleFormat::I16 => {
                let sink = Arc::clone(&shared);
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[i16], _| {
                        let converted: Vec<f32> =
                            data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                        sink.ingest(&converted);
                    },
                    err_fn,
                    None,
                )?
            }
            cpal::SampleFormat::U16 => {
                let sink = Arc::clone(&shared);
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[u16], _| {
                        let converted: Vec<f32> = data
                            .iter()
                            .map(|&s| (f32::from(s) - 32768.0) / 32768.0)
                            .collect();
                        sink.ingest(&converted);
                    },
                    err_fn,
                    None,
                )?
            }
            other => {
                return Err(CaptureError::UnsupportedFormat(format!("{other:?}")));
            }
        };

        stream.play()?;
        log::info!(
            "capture: stream started ({} Hz, {} ch, {:?})",
            self.sample_rate,
            self.channels,
            self.sample_format
        );

        Ok((shared, StreamHandle { _stream: stream }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> SharedCapture {
        SharedCapture::new(16_000, 1, 2.0)
    }

    #[test]
    fn samples_only_accumulate_while_recording() {
        let cap = capture();

        cap.ingest(&[0.5; 160]);
        assert!(!cap.is_recording());

        cap.start().unwrap();
        cap.ingest(&[0.5; 160]);
        cap.ingest(&[0.25; 160]);
        let clip = cap.stop().unwrap();

        // 320 mono samples at 16 kHz = 20 ms.
        assert!((clip.duration_secs - 0.02).abs() < 1e-6);
        assert_eq!(clip.bytes.len(), 44 + 320 * 2);
        assert_eq!(clip.mime, "audio/wav");
    }

    #[test]
    fn start_clears_previous_audio() {
        let cap = capture();

        cap.start().unwrap();
        cap.ingest(&[0.5; 160]);
        cap.stop().unwrap();

        cap.start().unwrap();
        let clip = cap.stop().unwrap();
        assert!(clip.is_empty());
    }

    #[test]
    fn stop_without_start_errors() {
        let cap = capture();
        assert!(matches!(cap.stop(), Err(CaptureError::NotRecording)));
    }

    #[test]
    fn level_tracks_latest_buffer() {
        let cap = capture();
        assert_eq!(cap.level(), 0.0);

        cap.ingest(&[0.5; 160]);
        assert!((cap.level() - 0.5).abs() < 1e-3);

        cap.ingest(&[0.0; 160]);
        assert!(cap.level() < 1e-6);
    }

    #[test]
    fn stereo_downmix_averages_frames() {
        let mono = SharedCapture::downmix(&[0.2, 0.4, -0.2, -0.4], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn bounded_buffer_keeps_recording_tail() {
        // 0.01 s cap at 16 kHz mono = 160 samples.
        let cap = SharedCapture::new(16_000, 1, 0.01);
        cap.start().unwrap();
        cap.ingest(&vec![0.1; 160]);
        cap.ingest(&vec![0.9; 160]);
        let clip = cap.stop().unwrap();

        // Only the most recent 160 samples survive.
        assert_eq!(clip.bytes.len(), 44 + 160 * 2);
    }

    #[test]
    fn unavailable_microphone_always_fails_start() {
        let mic = UnavailableMicrophone;
        assert!(matches!(mic.start(), Err(CaptureError::NoDevice)));
        assert!(!mic.is_recording());
        assert_eq!(mic.level(), 0.0);
    }
}
