use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Remote live speech service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Model identifier requested in the session setup
    pub model: String,
    /// Prebuilt voice used for synthesized replies
    pub voice: String,
    /// NATS server fronting the live speech relay
    pub nats_url: String,
    /// Language code used when a start request names none
    pub default_language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Microphone capture rate in Hz
    pub input_sample_rate: u32,
    /// Rate of synthesized speech returned by the service in Hz
    pub output_sample_rate: u32,
    /// Samples per captured frame
    pub frame_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-live".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3010,
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            voice: "Puck".to_string(),
            nats_url: "nats://localhost:4222".to_string(),
            default_language: "en".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_size: 4096,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
