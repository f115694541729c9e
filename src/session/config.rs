use serde::{Deserialize, Serialize};

use super::language::Language;
use crate::config::{AudioConfig, LiveConfig};

/// Configuration for one live speech session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique call identifier (e.g., "call-6f1c...")
    pub call_id: String,

    /// Model identifier requested from the service
    pub model: String,

    /// Requested response modality; always audio for a voice call
    pub response_modality: String,

    /// Prebuilt voice used for synthesized replies
    pub voice: String,

    /// Language code the agent is asked to speak
    pub language_code: String,

    /// Instruction embedding the conversational language
    pub system_instruction: String,

    /// Ask for streaming transcription of the person's speech
    pub input_transcription: bool,

    /// Ask for streaming transcription of the agent's speech
    pub output_transcription: bool,

    /// Uplink sample rate (microphone), Hz
    pub input_sample_rate: u32,

    /// Downlink sample rate (synthesized speech), Hz
    pub output_sample_rate: u32,
}

impl SessionConfig {
    pub fn for_language(live: &LiveConfig, audio: &AudioConfig, language: &Language) -> Self {
        Self {
            call_id: format!("call-{}", uuid::Uuid::new_v4()),
            model: live.model.clone(),
            response_modality: "AUDIO".to_string(),
            voice: live.voice.clone(),
            language_code: language.code.to_string(),
            system_instruction: system_instruction(language),
            input_transcription: true,
            output_transcription: true,
            input_sample_rate: audio.input_sample_rate,
            output_sample_rate: audio.output_sample_rate,
        }
    }
}

/// Phone-call persona instruction for the given language
pub fn system_instruction(language: &Language) -> String {
    format!(
        "You are a helpful and polite voice assistant on a live phone call. \
         Respond in {} ({}). \
         Keep your replies brief and conversational, the way people talk on the phone. \
         If asked what you can do, explain that you can converse in English and the 22 scheduled languages of India.",
        language.name, language.native_name
    )
}
