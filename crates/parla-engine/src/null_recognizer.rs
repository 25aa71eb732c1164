use crate::recognizer::{CallControl, RecognitionCall, Recognizer, RequestSink, ResponseStream};
use parla_core::{
    RecognitionError, SpeechAlternative, StreamingConfig, StreamingRequest, StreamingResponse,
    StreamingResult, WordInfo,
};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Echo recognizer for development: one interim result per audio frame and
/// a final summary once the client stops sending.
pub struct NullRecognizer;

impl NullRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for NullRecognizer {
    fn name(&self) -> &str {
        "null"
    }

    fn initialize(&mut self, _config: toml::Value) -> Result<(), RecognitionError> {
        Ok(())
    }

    fn open(&self, config: &StreamingConfig) -> Result<RecognitionCall, RecognitionError> {
        tracing::trace!(language_codes = ?config.language_codes, "NullRecognizer opened call");

        let shared = Arc::new(NullShared {
            state: Mutex::new(NullState::default()),
            ready: Condvar::new(),
            bytes_per_second: bytes_per_second(config),
        });
        Ok(RecognitionCall {
            requests: Box::new(NullSink(Arc::clone(&shared))),
            responses: Box::new(NullResponses(Arc::clone(&shared))),
            control: shared,
        })
    }
}

fn bytes_per_second(config: &StreamingConfig) -> f64 {
    (config.sample_rate_hertz as f64) * (config.audio_channel_count.max(1) as f64) * 2.0
}

#[derive(Default)]
struct NullState {
    pending: VecDeque<StreamingResponse>,
    total_bytes: usize,
    half_closed: bool,
    cancelled: bool,
}

struct NullShared {
    state: Mutex<NullState>,
    ready: Condvar,
    bytes_per_second: f64,
}

impl NullShared {
    fn lock(&self) -> MutexGuard<'_, NullState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CallControl for NullShared {
    fn cancel(&self) {
        self.lock().cancelled = true;
        self.ready.notify_all();
    }
}

fn single_result(transcript: String, is_final: bool, words: Vec<WordInfo>) -> StreamingResponse {
    StreamingResponse {
        results: vec![StreamingResult {
            alternatives: vec![SpeechAlternative { transcript, words }],
            is_final,
        }],
    }
}

struct NullSink(Arc<NullShared>);

impl RequestSink for NullSink {
    fn send(&mut self, request: StreamingRequest) -> Result<(), RecognitionError> {
        let mut state = self.0.lock();
        if state.cancelled || state.half_closed {
            return Err(RecognitionError::CallClosed);
        }
        if let StreamingRequest::Audio(frame) = request {
            state.total_bytes += frame.len();
            let response = single_result(format!("[null] {} bytes", frame.len()), false, vec![]);
            state.pending.push_back(response);
            self.0.ready.notify_all();
        }
        Ok(())
    }

    fn close_send(&mut self) -> Result<(), RecognitionError> {
        let mut state = self.0.lock();
        if state.cancelled {
            return Err(RecognitionError::CallClosed);
        }
        let total = state.total_bytes;
        let duration = total as f64 / self.0.bytes_per_second;
        let word = WordInfo {
            word: "[null]".to_string(),
            start_offset_seconds: 0.0,
            end_offset_seconds: duration,
            confidence: 1.0,
        };
        state
            .pending
            .push_back(single_result(format!("[null] {total} bytes"), true, vec![word]));
        state.half_closed = true;
        self.0.ready.notify_all();
        Ok(())
    }
}

struct NullResponses(Arc<NullShared>);

impl ResponseStream for NullResponses {
    fn next_response(&mut self) -> Result<Option<StreamingResponse>, RecognitionError> {
        let mut state = self.0.lock();
        loop {
            if state.cancelled {
                return Ok(None);
            }
            if let Some(response) = state.pending.pop_front() {
                return Ok(Some(response));
            }
            if state.half_closed {
                return Ok(None);
            }
            state = self
                .0
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
