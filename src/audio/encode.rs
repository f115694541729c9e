//! Outbound audio: normalized microphone frames to 16-bit PCM chunks.

use base64::Engine;

use super::backend::AudioFrame;

/// An encoded, transmission-ready block of outbound audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireAudioChunk {
    /// 16-bit little-endian PCM bytes
    pub data: Vec<u8>,
    /// Declared format tag, e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
}

impl WireAudioChunk {
    /// Base64 form used in JSON realtime input messages
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// Mime tag for linear PCM at the given rate
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}

/// Convert one normalized sample to i16, clamping out-of-range input
pub fn sample_to_i16(sample: f32) -> i16 {
    let scaled = (sample.clamp(-1.0, 1.0) * 32768.0).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode a frame as 16-bit little-endian PCM
///
/// Pure: the same frame always yields the same chunk, two bytes per sample.
pub fn encode_frame(frame: &AudioFrame) -> WireAudioChunk {
    let data: Vec<u8> = frame
        .samples
        .iter()
        .flat_map(|&s| sample_to_i16(s).to_le_bytes())
        .collect();

    WireAudioChunk {
        data,
        mime_type: pcm_mime_type(frame.sample_rate),
    }
}
