use serde::{Deserialize, Serialize};

use super::config::SessionConfig;
use crate::audio::WireAudioChunk;

// ============================================================================
// Outbound
// ============================================================================

/// Session setup sent once when the call connects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<Empty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<Empty>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// Serialized as `{}`; presence of the field is the flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

impl From<&SessionConfig> for SetupMessage {
    fn from(cfg: &SessionConfig) -> Self {
        let flag = |on: bool| if on { Some(Empty {}) } else { None };

        Self {
            setup: Setup {
                model: format!("models/{}", cfg.model),
                generation_config: GenerationConfig {
                    response_modalities: vec![cfg.response_modality.clone()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: cfg.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: cfg.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: flag(cfg.input_transcription),
                output_audio_transcription: flag(cfg.output_transcription),
            },
        }
    }
}

/// One uplink audio chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<InlineData>,
}

impl From<&WireAudioChunk> for RealtimeInputMessage {
    fn from(chunk: &WireAudioChunk) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![InlineData {
                    mime_type: chunk.mime_type.clone(),
                    data: chunk.to_base64(),
                }],
            },
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Base64 media with its format tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Any message the service pushes to us; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<Transcription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl ServerContent {
    /// The inline audio payload of the model turn, if any
    pub fn audio(&self) -> Option<&InlineData> {
        self.model_turn
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
    }

    pub fn output_text(&self) -> Option<&str> {
        self.output_transcription.as_ref().map(|t| t.text.as_str())
    }

    pub fn input_text(&self) -> Option<&str> {
        self.input_transcription.as_ref().map(|t| t.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioConfig, LiveConfig};
    use crate::session::language::find_language;

    #[test]
    fn test_setup_message_shape() {
        let cfg = SessionConfig::for_language(
            &LiveConfig::default(),
            &AudioConfig::default(),
            &find_language("bn").unwrap(),
        );
        let json = serde_json::to_value(SetupMessage::from(&cfg)).unwrap();

        let setup = &json["setup"];
        assert_eq!(
            setup["model"],
            "models/gemini-2.5-flash-native-audio-preview-12-2025"
        );
        assert_eq!(setup["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
        assert!(setup["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Bengali"));
        assert!(setup["inputAudioTranscription"].is_object());
        assert!(setup["outputAudioTranscription"].is_object());
    }

    #[test]
    fn test_realtime_input_shape() {
        let chunk = WireAudioChunk {
            data: vec![0, 0, 0, 0],
            mime_type: "audio/pcm;rate=16000".to_string(),
        };
        let json = serde_json::to_string(&RealtimeInputMessage::from(&chunk)).unwrap();
        assert_eq!(
            json,
            r#"{"realtimeInput":{"mediaChunks":[{"mimeType":"audio/pcm;rate=16000","data":"AAAAAA=="}]}}"#
        );
    }

    #[test]
    fn test_server_content_all_fields() {
        let json = r#"{
            "serverContent": {
                "outputTranscription": {"text": "Hello"},
                "inputTranscription": {"text": "Hi"},
                "turnComplete": true,
                "interrupted": false,
                "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAA="}}]}
            }
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let content = msg.server_content.unwrap();
        assert_eq!(content.output_text(), Some("Hello"));
        assert_eq!(content.input_text(), Some("Hi"));
        assert!(content.turn_complete);
        assert!(!content.interrupted);
        assert_eq!(content.audio().unwrap().data, "AAA=");
    }

    #[test]
    fn test_sparse_messages() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());

        let msg: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"interrupted": true}}"#).unwrap();
        let content = msg.server_content.unwrap();
        assert!(content.interrupted);
        assert!(!content.turn_complete);
        assert!(content.audio().is_none());
    }

    #[test]
    fn test_audio_skips_text_parts() {
        let json = r#"{"modelTurn": {"parts": [{"text": "thinking"}, {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AQI="}}]}}"#;
        let content: ServerContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.audio().unwrap().data, "AQI=");
    }
}
