//! JSON payloads exchanged with the client over text frames.

use parla_core::{ProtocolError, RecognitionEvent};
use serde::{Deserialize, Serialize};

pub const STOP_ACTION: &str = "stop";

/// Inbound control message, e.g. `{"action":"stop"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlMessage {
    #[serde(default)]
    pub action: Option<String>,
}

impl ControlMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_stop(&self) -> bool {
        self.action.as_deref() == Some(STOP_ACTION)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptPayload<'a> {
    transcript: &'a str,
    is_final: bool,
    words: Vec<WordPayload<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WordPayload<'a> {
    word: &'a str,
    start_time: f64,
    end_time: f64,
    confidence: f32,
}

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
}

pub fn encode_event(event: &RecognitionEvent) -> serde_json::Result<String> {
    let payload = TranscriptPayload {
        transcript: &event.transcript,
        is_final: event.is_final,
        words: event
            .words
            .iter()
            .map(|w| WordPayload {
                word: &w.word,
                start_time: w.start_offset_seconds,
                end_time: w.end_offset_seconds,
                confidence: w.confidence,
            })
            .collect(),
    };
    serde_json::to_string(&payload)
}

pub fn encode_error(message: &str) -> serde_json::Result<String> {
    serde_json::to_string(&ErrorPayload { error: message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parla_core::WordInfo;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_stop() {
        let msg = ControlMessage::parse(r#"{"action":"stop"}"#).unwrap();
        assert!(msg.is_stop());
    }

    #[test]
    fn test_parse_other_action_is_not_stop() {
        assert!(!ControlMessage::parse(r#"{"action":"pause"}"#).unwrap().is_stop());
        assert!(!ControlMessage::parse(r#"{}"#).unwrap().is_stop());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            ControlMessage::parse("stop"),
            Err(ProtocolError::MalformedControl(_))
        ));
    }

    #[test]
    fn test_encode_event_field_names() {
        let event = RecognitionEvent {
            transcript: "Hola mundo".to_string(),
            is_final: true,
            words: vec![WordInfo {
                word: "Hola".to_string(),
                start_offset_seconds: 0.0,
                end_offset_seconds: 0.5,
                confidence: 0.75,
            }],
        };
        let value: Value = serde_json::from_str(&encode_event(&event).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "transcript": "Hola mundo",
                "isFinal": true,
                "words": [{"word": "Hola", "startTime": 0.0, "endTime": 0.5, "confidence": 0.75}]
            })
        );
    }

    #[test]
    fn test_encode_interim_without_words() {
        let event = RecognitionEvent {
            transcript: "Hola".to_string(),
            is_final: false,
            words: vec![],
        };
        assert_eq!(
            encode_event(&event).unwrap(),
            r#"{"transcript":"Hola","isFinal":false,"words":[]}"#
        );
    }

    #[test]
    fn test_encode_error() {
        assert_eq!(
            encode_error("Speech recognizer not initialized").unwrap(),
            r#"{"error":"Speech recognizer not initialized"}"#
        );
    }
}
