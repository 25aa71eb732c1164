//! Deterministic recognizer driven by a fixed script, for exercising the
//! session bridge without a network peer.

use crate::recognizer::{CallControl, RecognitionCall, Recognizer, RequestSink, ResponseStream};
use parla_core::{
    AudioFrame, RecognitionError, SpeechAlternative, StreamingConfig, StreamingRequest,
    StreamingResponse, StreamingResult, WordInfo,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit this response.
    Respond(StreamingResponse),
    /// Block until at least this many audio frames have been sent.
    AwaitFrames(usize),
    /// Block until the send side has been half-closed.
    AwaitEndOfInput,
    /// Fail the response stream with this message.
    Fail(String),
}

impl ScriptStep {
    pub fn interim(transcript: &str) -> Self {
        ScriptStep::Respond(StreamingResponse {
            results: vec![StreamingResult {
                alternatives: vec![SpeechAlternative {
                    transcript: transcript.to_string(),
                    words: vec![],
                }],
                is_final: false,
            }],
        })
    }

    pub fn final_result(transcript: &str, words: Vec<WordInfo>) -> Self {
        ScriptStep::Respond(StreamingResponse {
            results: vec![StreamingResult {
                alternatives: vec![SpeechAlternative {
                    transcript: transcript.to_string(),
                    words,
                }],
                is_final: true,
            }],
        })
    }
}

/// What the recognizer observed across all of its calls.
#[derive(Default)]
pub struct CallStats {
    opened: AtomicUsize,
    released: AtomicUsize,
    half_closed: AtomicUsize,
    frames: Mutex<Vec<AudioFrame>>,
    configs: Mutex<Vec<StreamingConfig>>,
}

impl CallStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn half_closed(&self) -> usize {
        self.half_closed.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<AudioFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn configs(&self) -> Vec<StreamingConfig> {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct ScriptedRecognizer {
    steps: Vec<ScriptStep>,
    open_error: Option<String>,
    send_failure: Option<(usize, String)>,
    stats: Arc<CallStats>,
}

impl ScriptedRecognizer {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            open_error: None,
            send_failure: None,
            stats: Arc::new(CallStats::default()),
        }
    }

    /// Every `open` fails with this message.
    pub fn failing_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::new(vec![])
        }
    }

    /// Sending audio fails once `after_frames` frames have been accepted.
    pub fn with_send_failure(mut self, after_frames: usize, message: &str) -> Self {
        self.send_failure = Some((after_frames, message.to_string()));
        self
    }

    pub fn stats(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }
}

impl Recognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(&mut self, _config: toml::Value) -> Result<(), RecognitionError> {
        Ok(())
    }

    fn open(&self, _config: &StreamingConfig) -> Result<RecognitionCall, RecognitionError> {
        if let Some(message) = &self.open_error {
            return Err(RecognitionError::OpenFailed(message.clone()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);

        let shared = Arc::new(ScriptShared {
            state: Mutex::new(ScriptState::default()),
            changed: Condvar::new(),
            stats: Arc::clone(&self.stats),
        });
        Ok(RecognitionCall {
            requests: Box::new(ScriptSink {
                shared: Arc::clone(&shared),
                send_failure: self.send_failure.clone(),
            }),
            responses: Box::new(ScriptResponses {
                shared: Arc::clone(&shared),
                steps: self.steps.clone().into(),
            }),
            control: shared,
        })
    }
}

#[derive(Default)]
struct ScriptState {
    frames: usize,
    half_closed: bool,
    cancelled: bool,
}

struct ScriptShared {
    state: Mutex<ScriptState>,
    changed: Condvar,
    stats: Arc<CallStats>,
}

impl ScriptShared {
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CallControl for ScriptShared {
    fn cancel(&self) {
        let mut state = self.lock();
        if !state.cancelled {
            state.cancelled = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
        self.changed.notify_all();
    }
}

struct ScriptSink {
    shared: Arc<ScriptShared>,
    send_failure: Option<(usize, String)>,
}

impl RequestSink for ScriptSink {
    fn send(&mut self, request: StreamingRequest) -> Result<(), RecognitionError> {
        let mut state = self.shared.lock();
        if state.cancelled {
            return Err(RecognitionError::CallClosed);
        }
        match request {
            StreamingRequest::Config(config) => {
                self.shared
                    .stats
                    .configs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(config);
            }
            StreamingRequest::Audio(frame) => {
                if let Some((limit, message)) = &self.send_failure {
                    if state.frames >= *limit {
                        return Err(RecognitionError::Stream(message.clone()));
                    }
                }
                state.frames += 1;
                self.shared
                    .stats
                    .frames
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(frame);
            }
        }
        self.shared.changed.notify_all();
        Ok(())
    }

    fn close_send(&mut self) -> Result<(), RecognitionError> {
        let mut state = self.shared.lock();
        if state.cancelled {
            return Err(RecognitionError::CallClosed);
        }
        state.half_closed = true;
        self.shared.stats.half_closed.fetch_add(1, Ordering::SeqCst);
        self.shared.changed.notify_all();
        Ok(())
    }
}

struct ScriptResponses {
    shared: Arc<ScriptShared>,
    steps: VecDeque<ScriptStep>,
}

impl ScriptResponses {
    fn wait_until(&self, ready: impl Fn(&ScriptState) -> bool) -> Result<(), RecognitionError> {
        let mut state = self.shared.lock();
        loop {
            if state.cancelled {
                return Err(RecognitionError::CallClosed);
            }
            if ready(&state) {
                return Ok(());
            }
            state = self
                .shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl ResponseStream for ScriptResponses {
    fn next_response(&mut self) -> Result<Option<StreamingResponse>, RecognitionError> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                ScriptStep::Respond(response) => {
                    if self.shared.lock().cancelled {
                        return Err(RecognitionError::CallClosed);
                    }
                    return Ok(Some(response));
                }
                ScriptStep::AwaitFrames(n) => self.wait_until(|s| s.frames >= n || s.half_closed)?,
                ScriptStep::AwaitEndOfInput => self.wait_until(|s| s.half_closed)?,
                ScriptStep::Fail(message) => return Err(RecognitionError::Stream(message)),
            }
        }
        Ok(None)
    }
}
