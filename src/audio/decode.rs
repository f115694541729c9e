//! Inbound audio: base64 16-bit PCM payloads to playable buffers.

use base64::Engine;

use crate::error::{CallError, CallResult};

/// A decoded mono buffer ready for scheduling
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Normalized samples in [-1.0, 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// Build a silent buffer of the given duration (used by tests and tooling)
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = (duration_secs * sample_rate as f64).round() as usize;
        Self {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode raw little-endian 16-bit PCM bytes
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32) -> PcmBuffer {
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    PcmBuffer {
        samples,
        sample_rate,
    }
}

/// Decode a base64 inline audio payload
pub fn decode_payload(data: &str, sample_rate: u32) -> CallResult<PcmBuffer> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| CallError::Decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(CallError::Decode("empty audio payload".to_string()));
    }

    Ok(decode_pcm16(&bytes, sample_rate))
}

/// Read the `rate=` parameter of a PCM mime type, if present
pub fn rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload_duration() {
        // 12000 samples at 24kHz = 0.5s
        let bytes = vec![0u8; 24000];
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let buffer = decode_payload(&data, 24000).unwrap();
        assert_eq!(buffer.samples.len(), 12000);
        assert!((buffer.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_decode_pcm16_values() {
        let bytes: Vec<u8> = [16384i16, -32768, 0]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let buffer = decode_pcm16(&bytes, 24000);
        assert_eq!(buffer.samples, vec![0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_payload("not base64!!", 24000).unwrap_err();
        assert!(matches!(err, CallError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_payload("", 24000).is_err());
    }

    #[test]
    fn test_rate_from_mime() {
        assert_eq!(rate_from_mime("audio/pcm;rate=24000"), Some(24000));
        assert_eq!(rate_from_mime("audio/pcm; rate=16000"), Some(16000));
        assert_eq!(rate_from_mime("audio/pcm"), None);
    }

    #[test]
    fn test_silence_duration() {
        let buffer = PcmBuffer::silence(0.3, 24000);
        assert_eq!(buffer.samples.len(), 7200);
        assert!((buffer.duration() - 0.3).abs() < 1e-9);
    }
}
