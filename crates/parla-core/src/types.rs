/// One chunk of 16-bit little-endian mono PCM as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    bytes: Vec<u8>,
}

impl AudioFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for AudioFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioMessage {
    Frame(AudioFrame),
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordInfo {
    pub word: String,
    pub start_offset_seconds: f64,
    pub end_offset_seconds: f64,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    pub transcript: String,
    pub is_final: bool,
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultMessage {
    Event(RecognitionEvent),
    Failure(String),
    EndOfStream,
}

impl ResultMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultMessage::Event(_))
    }
}

/// Per-session parameters supplied when the client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub language_code: String,
}

impl SessionConfig {
    pub fn new(language_code: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Linear16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionFeatures {
    pub enable_word_time_offsets: bool,
    pub enable_word_confidence: bool,
    pub enable_automatic_punctuation: bool,
}

/// Configuration sent as the first message of a streaming recognition call.
/// Immutable once the call is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub audio_channel_count: u16,
    pub language_codes: Vec<String>,
    pub model: String,
    pub features: RecognitionFeatures,
    pub interim_results: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamingRequest {
    Config(StreamingConfig),
    Audio(AudioFrame),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAlternative {
    pub transcript: String,
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingResult {
    pub alternatives: Vec<SpeechAlternative>,
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingResponse {
    pub results: Vec<StreamingResult>,
}

impl StreamingResponse {
    /// One event per result that carries at least one alternative, built
    /// from the first alternative.
    pub fn into_events(self) -> impl Iterator<Item = RecognitionEvent> {
        self.results.into_iter().filter_map(|result| {
            let is_final = result.is_final;
            result
                .alternatives
                .into_iter()
                .next()
                .map(|first| RecognitionEvent {
                    transcript: first.transcript,
                    is_final,
                    words: first.words,
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str, start: f64, end: f64) -> WordInfo {
        WordInfo {
            word: w.to_string(),
            start_offset_seconds: start,
            end_offset_seconds: end,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_into_events_skips_results_without_alternatives() {
        let response = StreamingResponse {
            results: vec![
                StreamingResult {
                    alternatives: vec![],
                    is_final: false,
                },
                StreamingResult {
                    alternatives: vec![SpeechAlternative {
                        transcript: "hola".to_string(),
                        words: vec![],
                    }],
                    is_final: false,
                },
            ],
        };
        let events: Vec<_> = response.into_events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transcript, "hola");
        assert!(events[0].words.is_empty());
    }

    #[test]
    fn test_into_events_uses_first_alternative() {
        let response = StreamingResponse {
            results: vec![StreamingResult {
                alternatives: vec![
                    SpeechAlternative {
                        transcript: "Hola mundo".to_string(),
                        words: vec![word("Hola", 0.0, 0.3), word("mundo", 0.3, 0.7)],
                    },
                    SpeechAlternative {
                        transcript: "Ola mundo".to_string(),
                        words: vec![],
                    },
                ],
                is_final: true,
            }],
        };
        let events: Vec<_> = response.into_events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transcript, "Hola mundo");
        assert!(events[0].is_final);
        assert_eq!(events[0].words.len(), 2);
        assert_eq!(events[0].words[1].word, "mundo");
    }

    #[test]
    fn test_result_message_terminal() {
        assert!(ResultMessage::EndOfStream.is_terminal());
        assert!(ResultMessage::Failure("x".into()).is_terminal());
        let event = RecognitionEvent {
            transcript: String::new(),
            is_final: false,
            words: vec![],
        };
        assert!(!ResultMessage::Event(event).is_terminal());
    }

    #[test]
    fn test_audio_frame_roundtrips_bytes() {
        let frame = AudioFrame::from(vec![1, 2, 3, 4]);
        assert_eq!(frame.len(), 4);
        assert!(!frame.is_empty());
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4]);
    }
}
