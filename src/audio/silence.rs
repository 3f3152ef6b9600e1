//! Energy-based silence detection for hands-free turn-taking.
//!
//! [`SilenceDetector`] is a pure accumulator: the session's watcher task
//! samples the live capture level on a fixed interval (one window) and
//! feeds each reading to [`observe`](SilenceDetector::observe).  Once the
//! level stays below the threshold for the configured total duration, the
//! detector fires and the watcher stops the recording — no server
//! round-trip involved.
//!
//! Threshold, window and duration are configuration constants
//! ([`crate::config::SessionConfig`]), not negotiated at runtime.

use std::time::Duration;

use crate::config::SessionConfig;

// ---------------------------------------------------------------------------
// SilenceDetector
// ---------------------------------------------------------------------------

/// Accumulates sub-threshold windows until the silence duration is reached.
///
/// # Example
///
/// ```rust
/// use tivivu_voice::audio::SilenceDetector;
/// use std::time::Duration;
///
/// // 0.01 RMS threshold, 200 ms windows, fire after 2000 ms of silence.
/// let mut det = SilenceDetector::new(0.01, Duration::from_millis(200), Duration::from_millis(2000));
///
/// for _ in 0..9 {
///     assert!(!det.observe(0.0));
/// }
/// assert!(det.observe(0.0)); // 10th quiet window reaches 2000 ms
/// ```
pub struct SilenceDetector {
    /// RMS amplitude below which a window counts as silence.
    threshold: f32,
    /// Duration represented by one `observe` call.
    window: Duration,
    /// Continuous silence required before firing.
    required: Duration,
    /// Sub-threshold time accumulated so far.
    quiet: Duration,
}

impl SilenceDetector {
    pub fn new(threshold: f32, window: Duration, required: Duration) -> Self {
        Self {
            threshold,
            window,
            required,
            quiet: Duration::ZERO,
        }
    }

    /// Build from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.silence_threshold,
            Duration::from_millis(config.silence_window_ms),
            Duration::from_millis(config.silence_duration_ms),
        )
    }

    /// Sampling interval the watcher should use.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record one window with the given RMS level.  Returns `true` when the
    /// accumulated silence reaches the required duration; any window at or
    /// above the threshold resets the run.
    pub fn observe(&mut self, rms: f32) -> bool {
        if rms < self.threshold {
            self.quiet += self.window;
        } else {
            self.quiet = Duration::ZERO;
        }
        self.quiet >= self.required
    }

    /// Re-arm the detector for a new recording.
    pub fn reset(&mut self) {
        self.quiet = Duration::ZERO;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
