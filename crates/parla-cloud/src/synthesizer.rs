use crate::rest::RestEndpoint;
use async_trait::async_trait;
use base64::Engine;
use parla_core::{CloudConfig, CloudError};
use serde::{Deserialize, Serialize};

/// Unary text-to-speech. Returns MP3 bytes.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
    ) -> Result<Vec<u8>, CloudError>;
}

/// Cloud Text-to-Speech v1 over REST.
pub struct GoogleSynthesizer {
    endpoint: RestEndpoint,
}

impl GoogleSynthesizer {
    pub fn from_config(config: &CloudConfig) -> Result<Self, CloudError> {
        Ok(Self {
            endpoint: RestEndpoint::new(config, &config.tts_url, "TTS")?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

fn decode_audio(response: SynthesizeResponse) -> Result<Vec<u8>, CloudError> {
    base64::engine::general_purpose::STANDARD
        .decode(response.audio_content.as_bytes())
        .map_err(|e| CloudError::Response(format!("audioContent is not base64: {e}")))
}

#[async_trait]
impl Synthesizer for GoogleSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
    ) -> Result<Vec<u8>, CloudError> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code,
                name: voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        let response: SynthesizeResponse = self.endpoint.post(&request).await?;
        let audio = decode_audio(response)?;
        tracing::info!(language_code, voice_name, "synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_synthesizer_requires_api_key() {
        let config = CloudConfig {
            api_key: None,
            translate_url: String::new(),
            tts_url: String::new(),
            target_language: "en".to_string(),
        };
        match GoogleSynthesizer::from_config(&config) {
            Err(e) => assert_eq!(e.to_string(), "TTS client not initialized"),
            Ok(_) => panic!("expected NotConfigured"),
        }
    }

    #[test]
    fn test_request_shape() {
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "Hallo Welt" },
            voice: VoiceSelection {
                language_code: "de-DE",
                name: "de-DE-Wavenet-F",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "input": {"text": "Hallo Welt"},
                "voice": {"languageCode": "de-DE", "name": "de-DE-Wavenet-F"},
                "audioConfig": {"audioEncoding": "MP3"}
            })
        );
    }

    #[test]
    fn test_decode_audio() {
        let response = SynthesizeResponse {
            audio_content: "SUQzBA==".to_string(),
        };
        assert_eq!(decode_audio(response).unwrap(), b"ID3\x04".to_vec());

        let bad = SynthesizeResponse {
            audio_content: "***".to_string(),
        };
        assert!(matches!(decode_audio(bad), Err(CloudError::Response(_))));
    }
}
