pub mod backend;
pub mod decode;
pub mod devices;
pub mod encode;
pub mod file;
pub mod render;

pub use backend::{AudioDevices, AudioFrame, CaptureDevice, OutputDevice};
pub use decode::{decode_payload, decode_pcm16, rate_from_mime, PcmBuffer};
pub use devices::WavDevices;
pub use encode::{encode_frame, pcm_mime_type, WireAudioChunk};
pub use file::{AudioFile, WavCaptureDevice};
pub use render::WavOutputDevice;
