//! Fixed-capacity circular buffer for `f32` audio samples.
//!
//! The capture callback appends samples while recording is active; the
//! orchestrator drains the whole buffer when recording stops.  When a
//! recording runs past the configured maximum length, new samples overwrite
//! the oldest data, so the most recent `capacity` samples always survive.

// ---------------------------------------------------------------------------
// SampleBuffer
// ---------------------------------------------------------------------------

/// Bounded recording buffer with overwrite-oldest overflow behaviour.
///
/// # Example
///
/// ```rust
/// use tivivu_voice::audio::SampleBuffer;
///
/// let mut buf = SampleBuffer::new(4);
/// buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 samples → oldest dropped
/// assert_eq!(buf.drain(), vec![2.0, 3.0, 4.0, 5.0]);
/// ```
pub struct SampleBuffer {
    buf: Vec<f32>,
    capacity: usize,
    /// Next write position; wraps around `capacity`.
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SampleBuffer capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples on overflow.
    pub fn push_slice(&mut self, data: &[f32]) {
        for &sample in data {
            self.buf[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            }
        }
    }

    /// Take all stored samples in chronological order and reset the buffer.
    pub fn drain(&mut self) -> Vec<f32> {
        if self.len == 0 {
            return Vec::new();
        }

        // Before the first overflow, valid data starts at index 0; after it,
        // the oldest sample sits at `write_pos`.
        let read_pos = if self.len < self.capacity {
            0
        } else {
            self.write_pos
        };

        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            out.push(self.buf[(read_pos + i) % self.capacity]);
        }

        self.clear();
        out
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_in_order() {
        let mut buf = SampleBuffer::new(8);
        buf.push_slice(&[0.1, 0.2, 0.3]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.drain(), vec![0.1, 0.2, 0.3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_keeps_most_recent() {
        let mut buf = SampleBuffer::new(3);
        buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.drain(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn drain_empty_returns_empty_vec() {
        let mut buf = SampleBuffer::new(4);
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn clear_resets_without_allocating() {
        let mut buf = SampleBuffer::new(4);
        buf.push_slice(&[1.0, 2.0]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
        buf.push_slice(&[9.0]);
        assert_eq!(buf.drain(), vec![9.0]);
    }

    #[test]
    fn exact_capacity_fill_then_wrap() {
        let mut buf = SampleBuffer::new(4);
        buf.push_slice(&[1.0, 2.0, 3.0, 4.0]);
        buf.push_slice(&[5.0]);
        assert_eq!(buf.drain(), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_panics() {
        SampleBuffer::new(0);
    }
}
