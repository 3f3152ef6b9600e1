//! Minimal WAV (RIFF / PCM-16) encoding for API upload.
//!
//! The transcription gateway accepts standard container formats; a 44-byte
//! RIFF header over 16-bit little-endian PCM is the simplest one to produce
//! from the raw f32 capture buffer.

/// Encode f32 PCM samples as 16-bit WAV bytes.
///
/// Samples are clamped to `[-1.0, 1.0]` before conversion.  `channels` is
/// the interleave count of `samples` (1 = mono).
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * u32::from(channels) * 2;
    let block_align = channels * 2;

    let mut buf = Vec::with_capacity(44 + samples.len() * 2);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt subchunk (PCM)
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data subchunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&i.to_le_bytes());
    }

    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_length() {
        let samples = vec![0.0f32; 160];
        let wav = encode_wav_pcm16(&samples, 16_000, 1);

        assert_eq!(wav.len(), 44 + 160 * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        // Sample rate field at offset 24.
        let rate = u32::from_le_bytes(wav[24..28].try_into().unwrap());
        assert_eq!(rate, 16_000);

        // data chunk length at offset 40.
        let data_len = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_len, 320);
    }

    #[test]
    fn samples_are_clamped() {
        let wav = encode_wav_pcm16(&[2.0, -2.0], 16_000, 1);
        let first = i16::from_le_bytes(wav[44..46].try_into().unwrap());
        let second = i16::from_le_bytes(wav[46..48].try_into().unwrap());
        assert_eq!(first, 32767);
        assert_eq!(second, -32767);
    }

    #[test]
    fn stereo_header_fields() {
        let wav = encode_wav_pcm16(&[0.0; 4], 48_000, 2);
        let channels = u16::from_le_bytes(wav[22..24].try_into().unwrap());
        let block_align = u16::from_le_bytes(wav[32..34].try_into().unwrap());
        assert_eq!(channels, 2);
        assert_eq!(block_align, 4);
    }

    #[test]
    fn empty_input_is_header_only() {
        let wav = encode_wav_pcm16(&[], 16_000, 1);
        assert_eq!(wav.len(), 44);
    }
}
