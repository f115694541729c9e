pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod playback;
pub mod session;
pub mod transcript;

pub use audio::{
    AudioDevices, AudioFile, AudioFrame, CaptureDevice, OutputDevice, PcmBuffer, WavCaptureDevice,
    WavDevices, WavOutputDevice, WireAudioChunk,
};
pub use config::Config;
pub use error::{CallError, CallResult};
pub use http::{create_router, AppState};
pub use nats::NatsConnector;
pub use playback::{PlaybackScheduler, PlaybackUnit, UnitId};
pub use session::{
    CallController, CallState, CallStats, Language, SessionConfig, SessionEvent, SpeechConnector,
    SpeechSession, StartOutcome,
};
pub use transcript::{Role, TranscriptAggregator, TranscriptEntry};
